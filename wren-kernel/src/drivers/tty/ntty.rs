//! Default Line Discipline
//!
//! Cooked-mode terminal input over a fixed ring buffer. The ring is
//! split in three by position:
//!
//! ```text
//! [ head .. cooked )   complete lines, ready for readers
//! [ cooked .. tail )   the line still being typed (raw)
//! ```
//!
//! `receive_char` edits the raw region from interrupt context; a newline
//! (or EOF) *cooks* it, making it visible to readers and waking one.
//! Readers block in cancellable sleep while no cooked byte exists.
//! The tty layer brackets reads with the driver's I/O block, so the two
//! sides never interleave mid-update.

use alloc::sync::Arc;

use wren_arch::sync::IplMutex;
use wren_common::Errno;

use crate::sched::{Scheduler, WaitQueue};

use super::ldisc::{Echo, LineDiscipline};
use super::TtyDevice;

/// Ring capacity. One slot is kept free to distinguish full from empty,
/// so at most `NTTY_BUF_SIZE - 1` bytes are buffered.
pub const NTTY_BUF_SIZE: usize = 128;

const EOT: u8 = 0x04; // Ctrl-D
const BS: u8 = 0x08;
const NL: u8 = b'\n';
const CR: u8 = b'\r';
const DEL: u8 = 0x7F;

struct Ring {
    buf: [u8; NTTY_BUF_SIZE],
    /// Oldest unread cooked byte.
    head: usize,
    /// End of the cooked region, start of the raw region.
    cooked: usize,
    /// End of the raw region.
    tail: usize,
    /// An EOF arrived on an empty line; the next read returns 0.
    eof: bool,
}

impl Ring {
    const fn new() -> Self {
        Self {
            buf: [0; NTTY_BUF_SIZE],
            head: 0,
            cooked: 0,
            tail: 0,
            eof: false,
        }
    }

    fn is_full(&self) -> bool {
        (self.tail + 1) % NTTY_BUF_SIZE == self.head
    }

    fn raw_is_empty(&self) -> bool {
        self.tail == self.cooked
    }

    fn cooked_is_empty(&self) -> bool {
        self.cooked == self.head
    }

    /// Append to the raw region. False if the ring is full.
    fn push_raw(&mut self, c: u8) -> bool {
        if self.is_full() {
            return false;
        }
        self.buf[self.tail] = c;
        self.tail = (self.tail + 1) % NTTY_BUF_SIZE;
        true
    }

    /// Drop the newest raw byte. False if the raw region is empty.
    fn rub_out(&mut self) -> bool {
        if self.raw_is_empty() {
            return false;
        }
        self.tail = (self.tail + NTTY_BUF_SIZE - 1) % NTTY_BUF_SIZE;
        true
    }

    /// Promote the raw region to cooked.
    fn cook(&mut self) {
        self.cooked = self.tail;
    }
}

/// The default cooked-mode line discipline.
pub struct NTty {
    sched: &'static Scheduler,
    readers: WaitQueue,
    ring: IplMutex<Ring>,
}

impl NTty {
    /// Create a discipline that blocks readers through `sched`.
    #[must_use]
    pub fn new(sched: &'static Scheduler) -> Arc<Self> {
        Arc::new(Self {
            sched,
            readers: WaitQueue::new(),
            ring: IplMutex::new(Ring::new()),
        })
    }
}

impl LineDiscipline for NTty {
    fn attach(&self, tty: &Arc<TtyDevice>) {
        log::debug!("line discipline attached to tty {}", tty.id());
    }

    fn receive_char(&self, c: u8) -> Echo {
        // Carriage return reads as newline: terminals send either.
        let c = if c == CR { NL } else { c };

        let (echo, line_ready) = {
            let mut ring = self.ring.lock();
            match c {
                BS | DEL => {
                    if ring.rub_out() {
                        (Echo::from_bytes(b"\x08 \x08"), false)
                    } else {
                        (Echo::empty(), false)
                    }
                }
                EOT => {
                    if ring.raw_is_empty() {
                        ring.eof = true;
                    } else {
                        ring.cook();
                    }
                    (Echo::empty(), true)
                }
                NL => {
                    if ring.push_raw(NL) {
                        ring.cook();
                        (Echo::from_bytes(b"\r\n"), true)
                    } else {
                        (Echo::empty(), false)
                    }
                }
                c if (0x20..=0x7E).contains(&c) => {
                    if ring.push_raw(c) {
                        (Echo::byte(c), false)
                    } else {
                        (Echo::empty(), false)
                    }
                }
                // Unhandled control characters are dropped silently.
                _ => (Echo::empty(), false),
            }
        };

        if line_ready {
            // One line satisfies one reader.
            self.sched.wakeup_on(&self.readers);
        }
        echo
    }

    fn process_char(&self, c: u8) -> Echo {
        if c == NL {
            Echo::from_bytes(b"\r\n")
        } else {
            Echo::byte(c)
        }
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, Errno> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            {
                let mut ring = self.ring.lock();
                if !ring.cooked_is_empty() {
                    // Cooked mode: a read never crosses a line boundary.
                    let mut n = 0;
                    while n < buf.len() && !ring.cooked_is_empty() {
                        let c = ring.buf[ring.head];
                        ring.head = (ring.head + 1) % NTTY_BUF_SIZE;
                        buf[n] = c;
                        n += 1;
                        if c == NL {
                            break;
                        }
                    }
                    return Ok(n);
                }
                if ring.eof {
                    ring.eof = false;
                    return Ok(0);
                }
            }
            // A cancellation while sleeping wakes us normally with the
            // flag set; the retry above comes up empty and the next
            // sleep attempt surfaces the EINTR.
            self.sched.cancellable_sleep_on(&self.readers)?;
        }
    }
}
