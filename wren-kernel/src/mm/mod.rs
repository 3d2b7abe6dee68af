//! Memory Management Contracts
//!
//! The abstract backing-store interfaces demand paging is built on:
//! [`MemObject`](mmobj::MemObject) produces [`PageFrame`](frame::PageFrame)s
//! on lookup. The concrete stores (anonymous memory, file pages, shadow
//! chains) live behind the trait and are not the core's concern.

pub mod frame;
pub mod mmobj;

pub use frame::PageFrame;
pub use mmobj::{MemObjId, MemObject};
