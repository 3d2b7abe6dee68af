//! Heap-Break Manager
//!
//! `brk(2)`: moving the end of the process's dynamic region. The loader
//! sets `start_brk` (not necessarily page-aligned) and the matching
//! data/bss area; from then on the heap is always represented by at most
//! that one vmarea, whose lower bound is the page of `start_brk`.

use wren_common::memory::USER_MEM_HIGH;
use wren_common::{Errno, VirtAddr};
use wren_paging::PageNum;

use crate::task::Process;

/// Move the process break to `addr`, returning the new break.
///
/// `None` means "query": the current break comes back and nothing
/// changes. Growth is bounded by the next mapping above the heap and by
/// [`USER_MEM_HIGH`]; shrinking below `start_brk` is refused. Areas have
/// page granularity, so the break itself can sit anywhere inside the
/// heap's last page.
pub fn do_brk(proc: &Process, addr: Option<VirtAddr>) -> Result<VirtAddr, Errno> {
    let Some(addr) = addr else {
        return Ok(proc.brk());
    };

    let start_brk = proc.start_brk();
    if addr < start_brk {
        return Err(Errno::NoMem);
    }
    if addr.as_u64() >= USER_MEM_HIGH {
        return Err(Errno::NoMem);
    }
    if addr == proc.brk() {
        return Ok(addr);
    }

    let lopage = PageNum::of(start_brk);
    // Smallest page boundary covering every byte below addr. The page of
    // start_brk is never surrendered: it also holds the tail of data/bss.
    let new_end = if addr > start_brk {
        PageNum::of(VirtAddr::new(addr.as_u64() - 1)) + 1
    } else {
        lopage + 1
    };

    {
        let mut map = proc.vmmap();
        let heap_end = map
            .lookup(lopage)
            .map(|area| area.end())
            .expect("heap area missing from the address-space map");
        if new_end > heap_end && !map.is_range_empty(heap_end, new_end - heap_end) {
            return Err(Errno::NoMem);
        }
        let area = map
            .lookup_mut(lopage)
            .expect("heap area missing from the address-space map");
        area.set_end(new_end);
    }

    log::debug!("pid {}: break moved to {}", proc.pid(), addr);
    proc.set_brk(addr);
    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::sync::Arc;

    use wren_paging::{Prot, PAGE_SIZE};

    use crate::task::Process;
    use crate::test_util::{self, DummyObject};
    use crate::vm::vmmap::VmArea;

    const PAGE: u64 = PAGE_SIZE as u64;

    /// Process whose data/bss+heap area covers exactly the start-brk page.
    fn heap_process(start_brk: u64) -> Arc<Process> {
        let proc = test_util::process_with_brk(start_brk);
        let lopage = PageNum::of(VirtAddr::new(start_brk));
        proc.vmmap()
            .insert(VmArea::new(
                lopage,
                lopage + 1,
                Prot::RW,
                PageNum::new(0),
                DummyObject::new(),
            ))
            .unwrap();
        proc
    }

    fn heap_end(proc: &Process) -> u64 {
        let map = proc.vmmap();
        let area = map.lookup(PageNum::of(proc.start_brk())).unwrap();
        area.end().value()
    }

    #[test]
    fn test_query_returns_current_break() {
        let proc = heap_process(0x1000);
        assert_eq!(do_brk(&proc, None), Ok(VirtAddr::new(0x1000)));
        // No side effects: asking twice gives the same answer.
        assert_eq!(do_brk(&proc, None), Ok(VirtAddr::new(0x1000)));
        assert_eq!(heap_end(&proc), 2);
    }

    #[test]
    fn test_grow_into_free_range() {
        let proc = heap_process(0x1000);
        let r = do_brk(&proc, Some(VirtAddr::new(0x3500)));
        assert_eq!(r, Ok(VirtAddr::new(0x3500)));
        assert_eq!(proc.brk(), VirtAddr::new(0x3500));
        // 0x3500 lies in page 3, so the area now ends at page 4.
        assert_eq!(heap_end(&proc), 4);
        // Exactly one area covers [page(start_brk), page(addr-1)+1).
        let map = proc.vmmap();
        assert_eq!(map.len(), 1);
        assert!(map.lookup(PageNum::new(1)).is_some());
        assert!(map.lookup(PageNum::new(3)).is_some());
    }

    #[test]
    fn test_grow_into_occupied_range_fails() {
        let proc = heap_process(0x1000);
        proc.vmmap()
            .insert(VmArea::new(
                PageNum::new(3),
                PageNum::new(5),
                Prot::READ,
                PageNum::new(0),
                DummyObject::new(),
            ))
            .unwrap();
        let r = do_brk(&proc, Some(VirtAddr::new(0x3500)));
        assert_eq!(r, Err(Errno::NoMem));
        // Nothing moved.
        assert_eq!(proc.brk(), VirtAddr::new(0x1000));
        assert_eq!(heap_end(&proc), 2);
    }

    #[test]
    fn test_grow_up_to_neighbour_is_allowed() {
        let proc = heap_process(0x1000);
        proc.vmmap()
            .insert(VmArea::new(
                PageNum::new(3),
                PageNum::new(5),
                Prot::READ,
                PageNum::new(0),
                DummyObject::new(),
            ))
            .unwrap();
        // Up to 0x3000 exclusive: pages [1, 3), touching the neighbour.
        let r = do_brk(&proc, Some(VirtAddr::new(0x3000)));
        assert_eq!(r, Ok(VirtAddr::new(0x3000)));
        assert_eq!(heap_end(&proc), 3);
    }

    #[test]
    fn test_shrink() {
        let proc = heap_process(0x1000);
        do_brk(&proc, Some(VirtAddr::new(0x5000))).unwrap();
        assert_eq!(heap_end(&proc), 5);
        let r = do_brk(&proc, Some(VirtAddr::new(0x1800)));
        assert_eq!(r, Ok(VirtAddr::new(0x1800)));
        assert_eq!(proc.brk(), VirtAddr::new(0x1800));
        assert_eq!(heap_end(&proc), 2);
    }

    #[test]
    fn test_shrink_to_start_brk_keeps_first_page() {
        let proc = heap_process(0x1000);
        do_brk(&proc, Some(VirtAddr::new(0x5000))).unwrap();
        let r = do_brk(&proc, Some(VirtAddr::new(0x1000)));
        assert_eq!(r, Ok(VirtAddr::new(0x1000)));
        // The start-brk page stays mapped; later growth still finds the
        // heap area.
        assert_eq!(heap_end(&proc), 2);
        assert_eq!(do_brk(&proc, Some(VirtAddr::new(0x2800))), Ok(VirtAddr::new(0x2800)));
        assert_eq!(heap_end(&proc), 3);
    }

    #[test]
    fn test_below_start_brk_fails() {
        let proc = heap_process(0x1800);
        assert_eq!(
            do_brk(&proc, Some(VirtAddr::new(0x1000))),
            Err(Errno::NoMem)
        );
        assert_eq!(proc.brk(), VirtAddr::new(0x1800));
    }

    #[test]
    fn test_above_user_mem_high_fails() {
        let proc = heap_process(0x1000);
        assert_eq!(
            do_brk(&proc, Some(VirtAddr::new(USER_MEM_HIGH))),
            Err(Errno::NoMem)
        );
        assert_eq!(
            do_brk(&proc, Some(VirtAddr::new(USER_MEM_HIGH + PAGE))),
            Err(Errno::NoMem)
        );
    }

    #[test]
    fn test_set_to_current_break_is_noop() {
        let proc = heap_process(0x1234);
        assert_eq!(
            do_brk(&proc, Some(VirtAddr::new(0x1234))),
            Ok(VirtAddr::new(0x1234))
        );
        assert_eq!(heap_end(&proc), 2);
    }

    #[test]
    fn test_unaligned_start_brk() {
        // start_brk in the middle of page 1: its page is part of
        // data/bss, and growth counts from there.
        let proc = heap_process(0x1A00);
        let r = do_brk(&proc, Some(VirtAddr::new(0x2000)));
        // 0x2000 needs pages up to page(0x1FFF)+1 = 2.
        assert_eq!(r, Ok(VirtAddr::new(0x2000)));
        assert_eq!(heap_end(&proc), 2);
        let r = do_brk(&proc, Some(VirtAddr::new(0x2001)));
        assert_eq!(r, Ok(VirtAddr::new(0x2001)));
        assert_eq!(heap_end(&proc), 3);
    }
}
