//! Page-Fault Handler
//!
//! The demand-paging path: a user access trapped, and either a mapping
//! gets installed and the access retries invisibly, or the process dies
//! with EFAULT. The trap dispatcher has already rejected kernel-mode
//! faults: kernel code never touches unmapped user pages without
//! pinning them first, and the trap frame is not reentrant.

use wren_common::{Errno, VirtAddr};
use wren_paging::{MapFlags, PageNum};

use crate::sched::Scheduler;
use crate::task::Process;

use core::fmt;

/// Why the fault happened, as the hardware reports it.
///
/// # Layout
///
/// - Bit 0: the access was a write
/// - Bit 1: the access came from user mode (always set at entry)
/// - Bit 2: the access was an instruction fetch
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(transparent)]
pub struct FaultCause(u8);

impl FaultCause {
    /// Write access.
    pub const WRITE: Self = Self(1 << 0);

    /// User-mode access.
    pub const USER: Self = Self(1 << 1);

    /// Instruction fetch.
    pub const EXEC: Self = Self(1 << 2);

    /// Create a cause from raw trap bits.
    ///
    /// Only the lower 3 bits are used; upper bits are masked off.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0x07)
    }

    /// Get the raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Check for the write bit.
    #[inline]
    #[must_use]
    pub const fn is_write(self) -> bool {
        (self.0 & Self::WRITE.0) != 0
    }

    /// Check for the user bit.
    #[inline]
    #[must_use]
    pub const fn is_user(self) -> bool {
        (self.0 & Self::USER.0) != 0
    }

    /// Check for the exec bit.
    #[inline]
    #[must_use]
    pub const fn is_exec(self) -> bool {
        (self.0 & Self::EXEC.0) != 0
    }
}

impl core::ops::BitOr for FaultCause {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for FaultCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FaultCause({})", self)
    }
}

impl fmt::Display for FaultCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            if self.is_write() { "w" } else { "r" },
            if self.is_user() { "u" } else { "k" },
            if self.is_exec() { "x" } else { "-" },
        )
    }
}

/// Resolve a fault against the process's address-space map.
///
/// On success a mapping is installed and the faulting access can retry.
/// Any `Err` means the access was illegal and the process must die.
fn resolve(proc: &Process, vaddr: VirtAddr, cause: FaultCause) -> Result<(), Errno> {
    let pagenum = PageNum::of(vaddr);
    let for_write = cause.is_write();

    let (obj, index, flags) = {
        let map = proc.vmmap();
        let area = map.lookup(pagenum).ok_or(Errno::Fault)?;
        let prot = area.prot();

        // The hardware reports only the fault kind; the area's bits say
        // whether the process was allowed to do that kind of access.
        if !for_write && !prot.has_read() {
            return Err(Errno::Fault);
        }
        let mut flags = MapFlags::PRESENT | MapFlags::USER;
        if for_write {
            if !prot.has_write() {
                return Err(Errno::Fault);
            }
            flags |= MapFlags::WRITE;
        }
        if cause.is_exec() && !prot.has_exec() {
            return Err(Errno::Fault);
        }

        let index = area.offset() + (pagenum - area.start());
        (area.object().clone(), index, flags)
    };

    // The backing lookup may sleep on I/O; the map lock must not be held
    // across it.
    let frame = obj.lookup(index, for_write).map_err(|_| Errno::Fault)?;
    assert!(
        !frame.kvaddr().is_null(),
        "backing frame has no kernel mapping"
    );

    if for_write {
        // The writable half of the memory-object contract: the frame
        // belongs to the topmost writable object, which for the area's
        // own object is the area's object itself. This is what makes the
        // writable mapping below safe under copy-on-write.
        assert!(
            frame.object() == obj.id(),
            "writable lookup resolved outside the owning object"
        );
        frame.mark_dirty()?;
    }

    proc.pagedir()
        .map(vaddr.page_align_down(), frame.paddr(), flags)
        .expect("page table mapping failed");
    Ok(())
}

/// Handle a user-mode page fault at `vaddr`.
///
/// Either installs a mapping and returns, or terminates the current
/// process with EFAULT and never returns. No error ever reaches the
/// trap dispatcher.
pub fn handle_pagefault(sched: &Scheduler, vaddr: VirtAddr, cause: FaultCause) {
    assert!(cause.is_user(), "page fault from kernel mode");
    let proc = sched
        .current_process()
        .expect("page fault with no current process");
    log::debug!("pid {}: page fault at {} ({})", proc.pid(), vaddr, cause);

    if let Err(err) = resolve(&proc, vaddr, cause) {
        log::warn!(
            "pid {}: unresolvable fault at {}: {}",
            proc.pid(),
            vaddr,
            err
        );
        sched.exit_current(Errno::Fault.as_i32());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::boxed::Box;
    use alloc::sync::Arc;
    use alloc::vec::Vec;

    use wren_arch::sync::IplMutex;
    use wren_common::PhysAddr;
    use wren_paging::{PageDirectory, Prot, PAGE_SIZE};

    use crate::mm::{MemObjId, MemObject, PageFrame};
    use crate::task::{KThread, Process, ThreadState};
    use crate::test_util;
    use crate::vm::vmmap::VmArea;

    /// Memory object that serves frames from a fixed physical base and
    /// records every lookup.
    struct TracingObject {
        id: MemObjId,
        /// Stamp frames with a different owner, to exercise the
        /// writable-lookup assertion.
        frame_owner: MemObjId,
        fail: bool,
        lookups: Arc<IplMutex<Vec<(PageNum, bool)>>>,
        frames: Arc<IplMutex<Vec<Arc<PageFrame>>>>,
    }

    impl TracingObject {
        fn new() -> Self {
            let id = MemObjId::alloc();
            Self {
                id,
                frame_owner: id,
                fail: false,
                lookups: Arc::new(IplMutex::new(Vec::new())),
                frames: Arc::new(IplMutex::new(Vec::new())),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }
    }

    impl MemObject for TracingObject {
        fn id(&self) -> MemObjId {
            self.id
        }

        fn lookup(&self, pagenum: PageNum, for_write: bool) -> Result<Arc<PageFrame>, Errno> {
            self.lookups.lock().push((pagenum, for_write));
            if self.fail {
                return Err(Errno::NoMem);
            }
            let paddr = PhysAddr::new(0x8000_0000 + pagenum.value() * PAGE_SIZE as u64);
            let frame = Arc::new(PageFrame::new(
                self.frame_owner,
                pagenum,
                paddr,
                VirtAddr::new(0xFFFF_0000_0000_0000 + paddr.as_u64()),
            ));
            self.frames.lock().push(frame.clone());
            Ok(frame)
        }
    }

    /// Page directory that records every installed mapping.
    struct RecordingDir {
        maps: Arc<IplMutex<Vec<(VirtAddr, PhysAddr, MapFlags)>>>,
    }

    impl PageDirectory for RecordingDir {
        fn map(
            &mut self,
            vaddr: VirtAddr,
            paddr: PhysAddr,
            flags: MapFlags,
        ) -> Result<(), Errno> {
            self.maps.lock().push((vaddr, paddr, flags));
            Ok(())
        }
    }

    struct Fixture {
        proc: Arc<Process>,
        lookups: Arc<IplMutex<Vec<(PageNum, bool)>>>,
        frames: Arc<IplMutex<Vec<Arc<PageFrame>>>>,
        maps: Arc<IplMutex<Vec<(VirtAddr, PhysAddr, MapFlags)>>>,
    }

    /// Process with a single area `[10, 20)` at object offset `off`.
    fn fixture_with(obj: TracingObject, prot: Prot, off: u64) -> Fixture {
        let lookups = obj.lookups.clone();
        let frames = obj.frames.clone();
        let maps = Arc::new(IplMutex::new(Vec::new()));
        let proc = Process::new(
            Box::new(RecordingDir { maps: maps.clone() }),
            VirtAddr::new(0x1000),
        );
        proc.vmmap()
            .insert(VmArea::new(
                PageNum::new(10),
                PageNum::new(20),
                prot,
                PageNum::new(off),
                Arc::new(obj),
            ))
            .unwrap();
        Fixture {
            proc,
            lookups,
            frames,
            maps,
        }
    }

    fn fixture(prot: Prot) -> Fixture {
        fixture_with(TracingObject::new(), prot, 0)
    }

    const PAGE: u64 = PAGE_SIZE as u64;

    #[test]
    fn test_read_fault_on_readable_area() {
        let fx = fixture(Prot::READ);
        let vaddr = VirtAddr::new(10 * PAGE + 7);
        resolve(&fx.proc, vaddr, FaultCause::USER).unwrap();

        assert_eq!(*fx.lookups.lock(), [(PageNum::new(10), false)]);
        let maps = fx.maps.lock();
        assert_eq!(maps.len(), 1);
        let (mapped_va, _pa, flags) = maps[0];
        assert_eq!(mapped_va, VirtAddr::new(10 * PAGE));
        assert!(flags.is_present());
        assert!(flags.is_user());
        assert!(!flags.is_writable());
        // A read fault never dirties the frame.
        assert!(!fx.frames.lock()[0].is_dirty());
    }

    #[test]
    fn test_write_fault_on_writable_area() {
        let fx = fixture(Prot::RW);
        let vaddr = VirtAddr::new(10 * PAGE + 7);
        resolve(&fx.proc, vaddr, FaultCause::USER | FaultCause::WRITE).unwrap();

        assert_eq!(*fx.lookups.lock(), [(PageNum::new(10), true)]);
        let maps = fx.maps.lock();
        let (_va, pa, flags) = maps[0];
        assert!(flags.is_writable());
        assert_eq!(pa, PhysAddr::new(0x8000_0000 + 10 * PAGE));
        assert!(fx.frames.lock()[0].is_dirty());
    }

    #[test]
    fn test_write_fault_on_readonly_area() {
        let fx = fixture(Prot::READ);
        let vaddr = VirtAddr::new(10 * PAGE);
        let err = resolve(&fx.proc, vaddr, FaultCause::USER | FaultCause::WRITE).unwrap_err();
        assert_eq!(err, Errno::Fault);
        // Rejected before the backing store was consulted.
        assert!(fx.lookups.lock().is_empty());
        assert!(fx.maps.lock().is_empty());
    }

    #[test]
    fn test_fault_outside_any_area() {
        let fx = fixture(Prot::READ);
        let err = resolve(&fx.proc, VirtAddr::new(50 * PAGE), FaultCause::USER).unwrap_err();
        assert_eq!(err, Errno::Fault);
        assert!(fx.lookups.lock().is_empty());
    }

    #[test]
    fn test_read_fault_on_prot_none_area() {
        let fx = fixture(Prot::NONE);
        let err = resolve(&fx.proc, VirtAddr::new(10 * PAGE), FaultCause::USER).unwrap_err();
        assert_eq!(err, Errno::Fault);
    }

    #[test]
    fn test_exec_fault_checks_exec_bit() {
        let fx = fixture(Prot::RX);
        resolve(
            &fx.proc,
            VirtAddr::new(11 * PAGE),
            FaultCause::USER | FaultCause::EXEC,
        )
        .unwrap();

        let fx = fixture(Prot::READ);
        let err = resolve(
            &fx.proc,
            VirtAddr::new(11 * PAGE),
            FaultCause::USER | FaultCause::EXEC,
        )
        .unwrap_err();
        assert_eq!(err, Errno::Fault);
    }

    #[test]
    fn test_object_index_honours_area_offset() {
        let fx = fixture_with(TracingObject::new(), Prot::READ, 5);
        resolve(&fx.proc, VirtAddr::new(12 * PAGE), FaultCause::USER).unwrap();
        // 12 - area.start(10) + off(5) = 7
        assert_eq!(*fx.lookups.lock(), [(PageNum::new(7), false)]);
    }

    #[test]
    fn test_backing_error_becomes_efault() {
        let fx = fixture_with(TracingObject::failing(), Prot::READ, 0);
        let err = resolve(&fx.proc, VirtAddr::new(10 * PAGE), FaultCause::USER).unwrap_err();
        assert_eq!(err, Errno::Fault);
        assert!(fx.maps.lock().is_empty());
    }

    #[test]
    fn test_write_fault_to_foreign_frame_asserts() {
        let mut obj = TracingObject::new();
        obj.frame_owner = MemObjId::alloc();
        let fx = fixture_with(obj, Prot::RW, 0);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = resolve(
                &fx.proc,
                VirtAddr::new(10 * PAGE),
                FaultCause::USER | FaultCause::WRITE,
            );
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_unresolvable_fault_kills_process() {
        let sched = crate::sched::Scheduler::new();
        let fx = fixture(Prot::READ);
        let faulter = KThread::new(fx.proc.clone());
        sched.bootstrap(&faulter);
        // Someone has to be left to run after the exit.
        sched.make_runnable(&test_util::thread());

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            handle_pagefault(
                &sched,
                VirtAddr::new(10 * PAGE),
                FaultCause::USER | FaultCause::WRITE,
            );
        }));
        // Hosted divergence guard, as in the scheduler's exit tests.
        assert!(result.is_err());
        assert_eq!(fx.proc.exit_status(), Some(Errno::Fault.as_i32()));
        assert_eq!(faulter.state(), ThreadState::Exited);
    }

    #[test]
    fn test_resolvable_fault_returns_to_caller() {
        let sched = crate::sched::Scheduler::new();
        let fx = fixture(Prot::READ);
        let faulter = KThread::new(fx.proc.clone());
        sched.bootstrap(&faulter);

        handle_pagefault(&sched, VirtAddr::new(10 * PAGE + 7), FaultCause::USER);
        assert_eq!(fx.maps.lock().len(), 1);
        assert_eq!(fx.proc.exit_status(), None);
    }

    #[test]
    fn test_cause_display() {
        assert_eq!(format!("{}", FaultCause::USER), "ru-");
        assert_eq!(format!("{}", FaultCause::USER | FaultCause::WRITE), "wu-");
        assert_eq!(format!("{}", FaultCause::EXEC), "rkx");
    }
}
