//! Virtual Memory
//!
//! The per-process view of memory: the address-space map
//! ([`vmmap`]), the demand-paging fault handler ([`pagefault`]) and the
//! heap-break manager ([`brk`]).

pub mod brk;
pub mod pagefault;
pub mod vmmap;

pub use brk::do_brk;
pub use pagefault::{handle_pagefault, FaultCause};
pub use vmmap::{VmArea, VmMap};
