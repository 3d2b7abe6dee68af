//! Shared unit-test doubles.

use alloc::boxed::Box;
use alloc::sync::Arc;

use wren_common::{Errno, PhysAddr, VirtAddr};
use wren_paging::{MapFlags, PageDirectory, PageNum};

use crate::mm::{MemObjId, MemObject, PageFrame};
use crate::sched::Scheduler;
use crate::task::{KThread, Process};

/// Page directory that accepts every mapping and remembers nothing.
pub(crate) struct NullPageDir;

impl PageDirectory for NullPageDir {
    fn map(&mut self, _vaddr: VirtAddr, _paddr: PhysAddr, _flags: MapFlags) -> Result<(), Errno> {
        Ok(())
    }
}

/// Memory object for tests that never fault anything in.
pub(crate) struct DummyObject {
    id: MemObjId,
}

impl DummyObject {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            id: MemObjId::alloc(),
        })
    }
}

impl MemObject for DummyObject {
    fn id(&self) -> MemObjId {
        self.id
    }

    fn lookup(&self, _pagenum: PageNum, _for_write: bool) -> Result<Arc<PageFrame>, Errno> {
        Err(Errno::Fault)
    }
}

pub(crate) fn process() -> Arc<Process> {
    process_with_brk(0x1000)
}

pub(crate) fn process_with_brk(start_brk: u64) -> Arc<Process> {
    Process::new(Box::new(NullPageDir), VirtAddr::new(start_brk))
}

pub(crate) fn thread() -> Arc<KThread> {
    KThread::new(process())
}

/// A scheduler with the `'static` lifetime that long-lived objects expect.
pub(crate) fn leaked_scheduler() -> &'static Scheduler {
    Box::leak(Box::new(Scheduler::new()))
}
