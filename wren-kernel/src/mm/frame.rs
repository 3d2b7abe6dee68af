//! Page Frames
//!
//! A frame of physical memory produced by a memory object. The frame
//! knows its owner, its object-relative page number, where it sits in
//! physical memory, and where the kernel can reach its contents.

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

use wren_common::{Errno, PhysAddr, VirtAddr};
use wren_paging::PageNum;

use crate::mm::mmobj::MemObjId;

/// A physical page frame.
pub struct PageFrame {
    obj: MemObjId,
    pagenum: PageNum,
    paddr: PhysAddr,
    /// Kernel virtual address of the frame contents. Never null for a
    /// frame handed out by a successful lookup.
    kvaddr: VirtAddr,
    dirty: AtomicBool,
}

impl PageFrame {
    /// Create a clean frame.
    #[must_use]
    pub fn new(obj: MemObjId, pagenum: PageNum, paddr: PhysAddr, kvaddr: VirtAddr) -> Self {
        Self {
            obj,
            pagenum,
            paddr,
            kvaddr,
            dirty: AtomicBool::new(false),
        }
    }

    /// The owning memory object.
    #[inline]
    #[must_use]
    pub fn object(&self) -> MemObjId {
        self.obj
    }

    /// Object-relative page number.
    #[inline]
    #[must_use]
    pub fn pagenum(&self) -> PageNum {
        self.pagenum
    }

    /// Physical address of the frame.
    #[inline]
    #[must_use]
    pub fn paddr(&self) -> PhysAddr {
        self.paddr
    }

    /// Kernel virtual address of the frame contents.
    #[inline]
    #[must_use]
    pub fn kvaddr(&self) -> VirtAddr {
        self.kvaddr
    }

    /// Whether the frame has been dirtied since creation.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Mark the frame dirty, before a writable mapping is installed.
    ///
    /// The contract leaves room for stores that must pin or prepare a
    /// frame before accepting writes; this frame type always accepts.
    pub fn mark_dirty(&self) -> Result<(), Errno> {
        self.dirty.store(true, Ordering::Release);
        Ok(())
    }
}

impl fmt::Debug for PageFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageFrame")
            .field("obj", &self.obj)
            .field("pagenum", &self.pagenum)
            .field("paddr", &self.paddr)
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_frame_is_clean() {
        let f = PageFrame::new(
            MemObjId::alloc(),
            PageNum::new(3),
            PhysAddr::new(0x8000_3000),
            VirtAddr::new(0xFFFF_0000_8000_3000),
        );
        assert!(!f.is_dirty());
        assert_eq!(f.pagenum(), PageNum::new(3));
    }

    #[test]
    fn test_mark_dirty() {
        let f = PageFrame::new(
            MemObjId::alloc(),
            PageNum::new(0),
            PhysAddr::new(0x8000_0000),
            VirtAddr::new(0xFFFF_0000_8000_0000),
        );
        f.mark_dirty().unwrap();
        assert!(f.is_dirty());
        // A second dirtying is a no-op.
        f.mark_dirty().unwrap();
        assert!(f.is_dirty());
    }
}
