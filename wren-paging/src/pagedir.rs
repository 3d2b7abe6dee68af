//! The page-table contract
//!
//! The fault handler's entire view of the hardware page tables. The
//! concrete walker (entry formats, table allocation, TLB shootdown) lives
//! behind this trait and is not the core's concern.

use wren_common::{Errno, PhysAddr, VirtAddr};

use crate::MapFlags;

/// A per-process page directory.
///
/// One exists per process; the fault handler installs leaf mappings
/// through it. Implementations must be safe to drive from thread context
/// with the IPL raised (they must not sleep).
pub trait PageDirectory: Send {
    /// Install a mapping from the page containing `vaddr` to the frame at
    /// `paddr`.
    ///
    /// Both addresses must be page-aligned. An existing mapping for the
    /// page is replaced; a read-only mapping being upgraded on a write
    /// fault is the common case.
    ///
    /// Fails only on page-table allocation exhaustion, which the fault
    /// path treats as a kernel bug.
    fn map(&mut self, vaddr: VirtAddr, paddr: PhysAddr, flags: MapFlags) -> Result<(), Errno>;
}
