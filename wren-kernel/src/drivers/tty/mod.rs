//! Terminal Devices
//!
//! A tty couples a driver (the hardware side) with a line discipline
//! (the buffering and editing policy) and exposes the result as a byte
//! device. Key presses arrive through the driver callback, flow through
//! the discipline, and the echo goes straight back out; reads and writes
//! come down from the file layer and run with driver input blocked so
//! the discipline's buffers stay consistent.

use alloc::sync::Arc;

use wren_common::Errno;

use super::bytedev::{ByteDevice, DeviceId, TTY_MAJOR};

pub mod driver;
pub mod ldisc;
pub mod ntty;

pub use driver::{InputHandler, IoToken, TtyDriver};
pub use ldisc::{Echo, LineDiscipline};
pub use ntty::NTty;

use wren_arch::sync::IplMutex;

/// A terminal device.
pub struct TtyDevice {
    id: DeviceId,
    driver: Arc<dyn TtyDriver>,
    /// Installed after creation; input arriving before that is dropped.
    ldisc: IplMutex<Option<Arc<dyn LineDiscipline>>>,
}

impl TtyDevice {
    /// Create terminal `minor` on `driver`, with no line discipline yet.
    #[must_use]
    pub fn create(driver: Arc<dyn TtyDriver>, minor: u16) -> Arc<Self> {
        Arc::new(Self {
            id: DeviceId::new(TTY_MAJOR, minor),
            driver,
            ldisc: IplMutex::new(None),
        })
    }

    /// The device identity.
    #[inline]
    #[must_use]
    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Install the line discipline and attach it to this terminal.
    pub fn install_ldisc(self: &Arc<Self>, ldisc: Arc<dyn LineDiscipline>) {
        ldisc.attach(self);
        *self.ldisc.lock() = Some(ldisc);
    }

    /// Hook this terminal up to its driver's key-press callback.
    pub fn register_input(self: &Arc<Self>) -> Result<(), Errno> {
        let tty = Arc::downgrade(self);
        self.driver.register_callback(Arc::new(move |c| {
            if let Some(tty) = tty.upgrade() {
                tty.input(c);
            }
        }))
    }

    /// Accept one character from the driver and echo the discipline's
    /// response. Runs in interrupt context.
    pub fn input(&self, c: u8) {
        let Some(ldisc) = self.ldisc() else {
            return;
        };
        let echo = ldisc.receive_char(c);
        self.echo(&echo);
    }

    fn ldisc(&self) -> Option<Arc<dyn LineDiscipline>> {
        self.ldisc.lock().clone()
    }

    fn echo(&self, echo: &Echo) {
        for &c in echo.as_bytes() {
            self.driver.provide_char(c);
        }
    }
}

impl ByteDevice for TtyDevice {
    fn id(&self) -> DeviceId {
        self.id
    }

    /// Read buffered input, blocking until a line is available.
    ///
    /// Driver input stays blocked while the discipline copies out of its
    /// buffer. Only a byte count comes back: a read whose wait was
    /// cancelled reports 0 bytes.
    fn read(&self, _offset: usize, buf: &mut [u8]) -> Result<usize, Errno> {
        let ldisc = self
            .ldisc()
            .expect("tty read before line discipline installed");
        let token = self.driver.block_io();
        let n = ldisc.read(buf);
        self.driver.unblock_io(token);
        let n = n.unwrap_or(0);
        log::debug!("tty {}: read {} bytes", self.id, n);
        Ok(n)
    }

    /// Write `buf` through the discipline's output expansion.
    ///
    /// Every byte of `buf` is processed; an embedded NUL is data, not a
    /// terminator. Returns the number of *input* bytes consumed, not the
    /// number of bytes the expansion produced.
    fn write(&self, _offset: usize, buf: &[u8]) -> Result<usize, Errno> {
        let ldisc = self
            .ldisc()
            .expect("tty write before line discipline installed");
        let token = self.driver.block_io();
        for &c in buf {
            let echo = ldisc.process_char(c);
            self.echo(&echo);
        }
        self.driver.unblock_io(token);
        Ok(buf.len())
    }
}
