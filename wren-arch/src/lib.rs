//! # wren-arch
//!
//! The hardware boundary of the Wren kernel. Everything above this crate
//! is expressed in terms of three abstractions:
//!
//! - [`intr`]: the interrupt priority level (IPL) and the primitives for
//!   raising, lowering, and waiting on it
//! - [`sync::IplMutex`]: a spinlock that holds IPL at HIGH for the
//!   duration of each borrow; the kernel's critical-section type
//! - [`context`]: the opaque machine context and the single unsafe
//!   context-switch primitive
//!
//! On AArch64 the IPL maps onto DAIF interrupt masking and the context
//! switch is the usual callee-saved register exchange. On every other
//! target a software IPL model is installed so the scheduler and device
//! layers can be exercised by the host test harness.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod context;
pub mod intr;
pub mod sync;

pub use context::{context_switch, Context};
pub use intr::Ipl;
pub use sync::{IplMutex, IplMutexGuard};
