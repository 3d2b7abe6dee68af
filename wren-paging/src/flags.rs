//! Hardware mapping flags
//!
//! The flags a page-table entry carries once the fault handler installs a
//! mapping. The directory entry and the leaf entry mirror each other, so
//! one value describes both levels.

use core::fmt;

/// Flags for an installed page mapping.
///
/// # Layout
///
/// Packed into a single byte:
/// - Bit 0: Present
/// - Bit 1: Writable
/// - Bit 2: User-accessible
/// - Bits 3-7: Reserved (must be zero)
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(transparent)]
pub struct MapFlags(u8);

impl MapFlags {
    /// Empty flag set (entry not present).
    pub const NONE: Self = Self(0);

    /// Entry is present.
    pub const PRESENT: Self = Self(1 << 0);

    /// Entry permits writes.
    ///
    /// Installed only on write faults; a read fault on a writable area
    /// still maps read-only so the next write re-faults into the
    /// copy-on-write path.
    pub const WRITE: Self = Self(1 << 1);

    /// Entry is accessible from user mode.
    pub const USER: Self = Self(1 << 2);

    /// Create flags from raw bits.
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

    /// Check for the Present bit.
    #[inline]
    #[must_use]
    pub const fn is_present(self) -> bool {
        (self.0 & Self::PRESENT.0) != 0
    }

    /// Check for the Writable bit.
    #[inline]
    #[must_use]
    pub const fn is_writable(self) -> bool {
        (self.0 & Self::WRITE.0) != 0
    }

    /// Check for the User bit.
    #[inline]
    #[must_use]
    pub const fn is_user(self) -> bool {
        (self.0 & Self::USER.0) != 0
    }

    /// Check if these flags contain all the given flags.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl core::ops::BitOr for MapFlags {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl core::ops::BitOrAssign for MapFlags {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for MapFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MapFlags({})", self)
    }
}

impl fmt::Display for MapFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            if self.is_present() { "p" } else { "-" },
            if self.is_writable() { "w" } else { "-" },
            if self.is_user() { "u" } else { "-" },
        )
    }
}
