//! Kernel Logging
//!
//! Routes the `log` facade into a fixed ring of formatted records. The
//! ring keeps the most recent [`LOG_CAPACITY`] lines; a console or a
//! debugger drains it with [`for_each`]. Formatting happens into a stack
//! buffer, so logging is safe from interrupt context and never
//! allocates.

use core::fmt::{self, Write};

use log::{Level, LevelFilter, Log, Metadata, Record};
use wren_arch::sync::IplMutex;

/// Longest stored message line; longer ones are truncated.
pub const LOG_LINE_SIZE: usize = 120;

/// Number of retained records.
pub const LOG_CAPACITY: usize = 64;

#[derive(Clone, Copy)]
struct LogRecord {
    level: Level,
    len: u8,
    text: [u8; LOG_LINE_SIZE],
}

const EMPTY_RECORD: LogRecord = LogRecord {
    level: Level::Trace,
    len: 0,
    text: [0; LOG_LINE_SIZE],
};

struct LogRing {
    records: [LogRecord; LOG_CAPACITY],
    /// Next slot to write.
    head: usize,
    /// Number of live records, saturating at capacity.
    len: usize,
}

impl LogRing {
    const fn new() -> Self {
        Self {
            records: [EMPTY_RECORD; LOG_CAPACITY],
            head: 0,
            len: 0,
        }
    }

    fn push(&mut self, record: LogRecord) {
        self.records[self.head] = record;
        self.head = (self.head + 1) % LOG_CAPACITY;
        if self.len < LOG_CAPACITY {
            self.len += 1;
        }
    }
}

static RING: IplMutex<LogRing> = IplMutex::new(LogRing::new());

/// Stack buffer for formatting one message.
struct LineBuffer {
    data: [u8; LOG_LINE_SIZE],
    len: usize,
}

impl LineBuffer {
    const fn new() -> Self {
        Self {
            data: [0; LOG_LINE_SIZE],
            len: 0,
        }
    }
}

impl Write for LineBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        let remaining = LOG_LINE_SIZE - self.len;
        let to_copy = bytes.len().min(remaining);
        self.data[self.len..self.len + to_copy].copy_from_slice(&bytes[..to_copy]);
        self.len += to_copy;
        Ok(())
    }
}

struct KernelLogger;

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Debug
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut line = LineBuffer::new();
        let _ = write!(line, "{}: {}", record.target(), record.args());

        RING.lock().push(LogRecord {
            level: record.level(),
            len: line.len as u8,
            text: line.data,
        });
    }

    fn flush(&self) {}
}

static LOGGER: KernelLogger = KernelLogger;

/// Route the `log` macros into the kernel ring. Idempotent.
pub fn init() {
    log::set_logger(&LOGGER)
        .map(|()| log::set_max_level(LevelFilter::Debug))
        .ok();
}

/// Visit the retained records, oldest first.
pub fn for_each(mut f: impl FnMut(Level, &str)) {
    let ring = RING.lock();
    for i in 0..ring.len {
        let idx = (ring.head + LOG_CAPACITY - ring.len + i) % LOG_CAPACITY;
        let record = &ring.records[idx];
        let text = core::str::from_utf8(&record.text[..record.len as usize]).unwrap_or("<invalid>");
        f(record.level, text);
    }
}
