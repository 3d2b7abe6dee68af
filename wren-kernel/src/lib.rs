//! # wren-kernel
//!
//! The core of the Wren teaching kernel: the pieces that give user
//! processes the illusion of private, demand-paged address spaces on top
//! of a cooperative, interrupt-driven kernel thread scheduler, with a
//! character-device path for terminal I/O.
//!
//! # Subsystems
//!
//! - [`sched`]: run queue, wait queues, cancellable sleep, the context
//!   switch
//! - [`task`]: kernel threads and processes
//! - [`mm`]: the memory-object and page-frame contracts backing demand
//!   paging
//! - [`vm`]: the per-process address-space map, the page-fault handler
//!   and the heap-break manager
//! - [`drivers`]: byte devices, the tty layer and the default line
//!   discipline
//! - [`logging`]: the kernel logger behind the `log` facade
//!
//! # Concurrency model
//!
//! Single CPU, cooperative switching: a thread runs until it sleeps or
//! yields, and the only asynchrony is interrupt handlers. Every structure
//! both worlds touch lives behind an
//! [`IplMutex`](wren_arch::sync::IplMutex), whose borrow raises the
//! interrupt priority level for its duration.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod drivers;
pub mod logging;
pub mod mm;
pub mod sched;
pub mod task;
pub mod vm;

#[cfg(test)]
mod test_util;
