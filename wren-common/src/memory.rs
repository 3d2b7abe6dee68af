//! User Address-Space Layout
//!
//! Constants describing the portion of the virtual address space handed to
//! userland. The kernel itself lives in the high half and is outside these
//! bounds.

/// Lowest address available to user mappings.
///
/// The first 4MB are kept unmapped so null-pointer dereferences (with
/// generous offsets) fault rather than silently read mapped memory.
pub const USER_MEM_LOW: u64 = 0x0000_0000_0040_0000;

/// First address past the user half of the address space.
///
/// User mappings, including the process heap, may never reach this
/// address. With a 48-bit virtual address space this is the top of the
/// low (TTBR0) half.
pub const USER_MEM_HIGH: u64 = 0x0000_8000_0000_0000;

// Compile-time verification of the layout
const _: () = assert!(USER_MEM_LOW < USER_MEM_HIGH);
const _: () = assert!(USER_MEM_LOW & 0xFFF == 0, "layout bounds must be page-aligned");
const _: () = assert!(USER_MEM_HIGH & 0xFFF == 0, "layout bounds must be page-aligned");
