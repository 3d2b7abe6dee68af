//! Device Layer
//!
//! The byte-device abstraction and the terminal stack built on it.

pub mod bytedev;
pub mod tty;

pub use bytedev::{ByteDevice, DeviceId};
