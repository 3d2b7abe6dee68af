//! Address-Space Map
//!
//! The ordered collection of [`VmArea`]s describing a process's virtual
//! address space. Areas cover half-open page ranges, never overlap, and
//! each maps a window of exactly one memory object.

use alloc::sync::Arc;
use alloc::vec::Vec;

use wren_common::Errno;
use wren_paging::{PageNum, Prot};

use crate::mm::MemObject;

/// A contiguous mapped region with uniform protection and one backing
/// object.
pub struct VmArea {
    start: PageNum,
    end: PageNum,
    prot: Prot,
    /// Offset into the backing object: faulting page `p` resolves to
    /// object page `off + (p - start)`.
    off: PageNum,
    obj: Arc<dyn MemObject>,
}

impl VmArea {
    /// Create an area covering `[start, end)`.
    ///
    /// # Panics
    ///
    /// Panics if the range is empty.
    #[must_use]
    pub fn new(
        start: PageNum,
        end: PageNum,
        prot: Prot,
        off: PageNum,
        obj: Arc<dyn MemObject>,
    ) -> Self {
        assert!(start < end, "vmarea must cover at least one page");
        Self {
            start,
            end,
            prot,
            off,
            obj,
        }
    }

    /// First page of the area.
    #[inline]
    #[must_use]
    pub fn start(&self) -> PageNum {
        self.start
    }

    /// First page past the area.
    #[inline]
    #[must_use]
    pub fn end(&self) -> PageNum {
        self.end
    }

    /// Protection bits.
    #[inline]
    #[must_use]
    pub fn prot(&self) -> Prot {
        self.prot
    }

    /// Offset into the backing object, in pages.
    #[inline]
    #[must_use]
    pub fn offset(&self) -> PageNum {
        self.off
    }

    /// The backing object.
    #[inline]
    #[must_use]
    pub fn object(&self) -> &Arc<dyn MemObject> {
        &self.obj
    }

    /// Check whether the area covers `pn`.
    #[inline]
    #[must_use]
    pub fn contains(&self, pn: PageNum) -> bool {
        self.start <= pn && pn < self.end
    }

    /// Move the end boundary. The brk path has already established that
    /// the new range neither empties the area nor collides with a
    /// neighbour.
    pub(crate) fn set_end(&mut self, end: PageNum) {
        debug_assert!(end > self.start);
        self.end = end;
    }
}

/// A process's address-space map: disjoint areas, ordered by start page.
pub struct VmMap {
    areas: Vec<VmArea>,
}

impl VmMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self { areas: Vec::new() }
    }

    /// Number of areas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.areas.len()
    }

    /// Check if the map has no areas.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// Iterate the areas in address order.
    pub fn iter(&self) -> impl Iterator<Item = &VmArea> {
        self.areas.iter()
    }

    /// Insert an area, keeping the map ordered.
    ///
    /// Rejects any overlap with an existing area.
    pub fn insert(&mut self, area: VmArea) -> Result<(), Errno> {
        let pos = self
            .areas
            .iter()
            .position(|a| a.start >= area.end)
            .unwrap_or(self.areas.len());
        if pos > 0 && self.areas[pos - 1].end > area.start {
            return Err(Errno::Inval);
        }
        self.areas.insert(pos, area);
        Ok(())
    }

    /// The unique area covering `pn`, if any.
    #[must_use]
    pub fn lookup(&self, pn: PageNum) -> Option<&VmArea> {
        self.areas.iter().find(|a| a.contains(pn))
    }

    pub(crate) fn lookup_mut(&mut self, pn: PageNum) -> Option<&mut VmArea> {
        self.areas.iter_mut().find(|a| a.contains(pn))
    }

    /// Check that no area intersects `[lo, lo + pages)`.
    #[must_use]
    pub fn is_range_empty(&self, lo: PageNum, pages: u64) -> bool {
        let hi = lo + pages;
        self.areas.iter().all(|a| a.end <= lo || a.start >= hi)
    }
}

impl Default for VmMap {
    fn default() -> Self {
        Self::new()
    }
}
