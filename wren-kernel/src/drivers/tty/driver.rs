//! Terminal Driver Contract
//!
//! What the tty layer asks of the thing that actually owns the hardware
//! (a virtual terminal, a UART, or a test double): deliver key presses
//! upward, accept characters downward, and gate its own interrupt-driven
//! input while the line discipline's buffers are being touched.

use alloc::sync::Arc;

use wren_common::Errno;

/// Opaque handle returned by [`TtyDriver::block_io`] and consumed by
/// [`TtyDriver::unblock_io`].
///
/// Whatever masking state the driver saved when blocking rides in here;
/// the tty layer holds it without interpreting it.
#[derive(Debug)]
pub struct IoToken {
    raw: u64,
}

impl IoToken {
    /// Wrap driver state in a token.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self { raw }
    }

    /// Recover the driver state.
    #[inline]
    #[must_use]
    pub const fn raw(&self) -> u64 {
        self.raw
    }
}

/// Callback invoked by the driver, from interrupt context, once per
/// received character.
pub type InputHandler = Arc<dyn Fn(u8) + Send + Sync>;

/// A terminal driver.
pub trait TtyDriver: Send + Sync {
    /// Install the input callback. At most one may be registered;
    /// a second registration fails with `EBUSY`.
    fn register_callback(&self, handler: InputHandler) -> Result<(), Errno>;

    /// Output one character to the terminal.
    fn provide_char(&self, c: u8);

    /// Suspend input delivery, returning the driver's saved state.
    ///
    /// While blocked, no [`InputHandler`] invocations occur, so the line
    /// discipline's buffers can be read and written without an
    /// interrupt-driven keystroke landing mid-update.
    fn block_io(&self) -> IoToken;

    /// Resume input delivery from the state saved in `token`.
    fn unblock_io(&self, token: IoToken);
}
