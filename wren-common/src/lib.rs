//! # wren-common
//!
//! Shared foundation types for the Wren teaching kernel.
//!
//! This crate defines the vocabulary the rest of the kernel speaks:
//! - [`PhysAddr`]/[`VirtAddr`](addr::VirtAddr): typed memory addresses
//! - [`Errno`](errno::Errno): the kernel error code type
//! - [`memory`]: the user address-space layout constants
//!
//! # no_std
//!
//! This crate is `no_std` and has zero dependencies, making it suitable
//! as a foundation crate that every other Wren crate can depend on.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod addr;
pub mod errno;
pub mod memory;

// Re-export commonly used types
pub use addr::{PhysAddr, VirtAddr};
pub use errno::Errno;
