//! Memory Objects
//!
//! A memory object is a producer of page frames, indexed by
//! object-relative page number. A vmarea maps a window of one; the fault
//! handler asks it for the frame behind a faulting page.
//!
//! Copy-on-write is the object's own business, realised through internal
//! *shadow* chains: a shadow object layered on another catches writes
//! while reads fall through. The core never sees the chain, only the
//! `for_write` contract below.

use alloc::sync::Arc;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use wren_common::Errno;
use wren_paging::PageNum;

use crate::mm::frame::PageFrame;

/// Identity of a memory object.
///
/// Frames are stamped with their owner's id so the fault handler can
/// assert the writable-lookup contract.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct MemObjId(u64);

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

impl MemObjId {
    /// Allocate a fresh id. Ids are never reused.
    #[must_use]
    pub fn alloc() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw id value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for MemObjId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemObjId({})", self.0)
    }
}

/// A backing store for mapped pages.
pub trait MemObject: Send + Sync {
    /// This object's identity.
    fn id(&self) -> MemObjId;

    /// Produce the frame behind object-relative page `pagenum`.
    ///
    /// May block on I/O; callers must not hold IPL-raising locks across
    /// the call.
    ///
    /// With `for_write` the returned frame belongs to the topmost
    /// writable object of the shadow chain; for the object a vmarea
    /// holds, that is the object itself, which is what makes installing
    /// a writable mapping safe. Without `for_write` the frame may belong
    /// to any object down the chain.
    fn lookup(&self, pagenum: PageNum, for_write: bool) -> Result<Arc<PageFrame>, Errno>;
}
