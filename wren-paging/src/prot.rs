//! Mapping protection bits
//!
//! The permissions a virtual-memory area grants, as recorded in the
//! address-space map. These are the *intent* bits the fault handler
//! checks; the hardware-level flags actually installed are
//! [`MapFlags`](crate::flags::MapFlags).

use core::fmt;

/// Protection bits for a mapped region.
///
/// # Layout
///
/// Packed into a single byte:
/// - Bit 0: Read
/// - Bit 1: Write
/// - Bit 2: Execute
/// - Bits 3-7: Reserved (must be zero)
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(transparent)]
pub struct Prot(u8);

impl Prot {
    /// No access.
    pub const NONE: Self = Self(0);

    /// Read permission.
    pub const READ: Self = Self(1 << 0);

    /// Write permission.
    pub const WRITE: Self = Self(1 << 1);

    /// Execute permission.
    pub const EXEC: Self = Self(1 << 2);

    /// All permissions.
    pub const ALL: Self = Self(0x07);

    /// Read and write.
    pub const RW: Self = Self(Self::READ.0 | Self::WRITE.0);

    /// Read and execute.
    pub const RX: Self = Self(Self::READ.0 | Self::EXEC.0);

    /// Create protection bits from raw bits.
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

    /// Check for the Read bit.
    #[inline]
    #[must_use]
    pub const fn has_read(self) -> bool {
        (self.0 & Self::READ.0) != 0
    }

    /// Check for the Write bit.
    #[inline]
    #[must_use]
    pub const fn has_write(self) -> bool {
        (self.0 & Self::WRITE.0) != 0
    }

    /// Check for the Execute bit.
    #[inline]
    #[must_use]
    pub const fn has_exec(self) -> bool {
        (self.0 & Self::EXEC.0) != 0
    }

    /// Check if these bits contain all the given bits.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check if no bits are set.
    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl core::ops::BitOr for Prot {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl core::ops::BitOrAssign for Prot {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Prot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Prot({})", self)
    }
}

impl fmt::Display for Prot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            if self.has_read() { "r" } else { "-" },
            if self.has_write() { "w" } else { "-" },
            if self.has_exec() { "x" } else { "-" },
        )
    }
}
