//! Processes
//!
//! The slice of the process structure the core needs: the address-space
//! map, the page-directory handle, and the heap-break bookkeeping. The
//! rest of process life (fork, wait, file tables) lives outside the core;
//! only exit-on-fault touches these fields from here.

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

use wren_arch::sync::{IplMutex, IplMutexGuard};
use wren_common::VirtAddr;
use wren_paging::PageDirectory;

use crate::vm::vmmap::VmMap;

/// Process identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Pid(u32);

impl Pid {
    /// Get the raw pid value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pid({})", self.0)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

static NEXT_PID: AtomicU32 = AtomicU32::new(1);

/// A process, as the virtual-memory and scheduling core sees it.
pub struct Process {
    pid: Pid,
    /// Initial heap break, set by the loader. Not necessarily
    /// page-aligned, and never changes.
    start_brk: VirtAddr,
    /// Current heap break. Always >= `start_brk`.
    brk: IplMutex<VirtAddr>,
    vmmap: IplMutex<VmMap>,
    pagedir: IplMutex<Box<dyn PageDirectory>>,
    exit_status: IplMutex<Option<i32>>,
}

impl Process {
    /// Create a process with an empty address-space map.
    ///
    /// The loader populates the map and sets up the initial thread; both
    /// are outside the core.
    #[must_use]
    pub fn new(pagedir: Box<dyn PageDirectory>, start_brk: VirtAddr) -> Arc<Self> {
        Arc::new(Self {
            pid: Pid(NEXT_PID.fetch_add(1, Ordering::Relaxed)),
            start_brk,
            brk: IplMutex::new(start_brk),
            vmmap: IplMutex::new(VmMap::new()),
            pagedir: IplMutex::new(pagedir),
            exit_status: IplMutex::new(None),
        })
    }

    /// Process id.
    #[inline]
    #[must_use]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// The immutable initial break.
    #[inline]
    #[must_use]
    pub fn start_brk(&self) -> VirtAddr {
        self.start_brk
    }

    /// The current break.
    #[must_use]
    pub fn brk(&self) -> VirtAddr {
        *self.brk.lock()
    }

    pub(crate) fn set_brk(&self, addr: VirtAddr) {
        debug_assert!(addr >= self.start_brk);
        *self.brk.lock() = addr;
    }

    /// Borrow the address-space map.
    pub fn vmmap(&self) -> IplMutexGuard<'_, VmMap> {
        self.vmmap.lock()
    }

    /// Borrow the page directory.
    pub fn pagedir(&self) -> IplMutexGuard<'_, Box<dyn PageDirectory>> {
        self.pagedir.lock()
    }

    /// The recorded exit status, once the process has exited.
    #[must_use]
    pub fn exit_status(&self) -> Option<i32> {
        *self.exit_status.lock()
    }

    pub(crate) fn set_exit_status(&self, status: i32) {
        *self.exit_status.lock() = Some(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util;

    #[test]
    fn test_new_process_brk() {
        let p = test_util::process_with_brk(0x1234);
        assert_eq!(p.start_brk(), VirtAddr::new(0x1234));
        assert_eq!(p.brk(), VirtAddr::new(0x1234));
        assert!(p.vmmap().is_empty());
        assert_eq!(p.exit_status(), None);
    }

    #[test]
    fn test_pids_are_unique() {
        let a = test_util::process();
        let b = test_util::process();
        assert_ne!(a.pid(), b.pid());
    }
}
