//! Kernel error codes
//!
//! Defines the error codes the core hands back to userland. The numbering
//! follows POSIX so the syscall layer can return `-errno` without a
//! translation table.

use core::fmt;

/// Kernel error code.
///
/// Carried in `Result<_, Errno>` returns wherever an operation can fail
/// for a user-visible reason. Invariant violations are asserted, never
/// returned.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Errno {
    /// Interrupted sleep (cancellation observed before blocking).
    Intr = 4,
    /// Out of memory, or an address range conflict.
    NoMem = 12,
    /// Bad address: no mapping, or insufficient permissions.
    Fault = 14,
    /// Resource busy (e.g. a driver callback slot already taken).
    Busy = 16,
    /// Invalid argument.
    Inval = 22,
}

impl Errno {
    /// Get the raw POSIX errno value.
    #[inline]
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the negated value used in raw syscall returns.
    #[inline]
    #[must_use]
    pub const fn as_neg_i32(self) -> i32 {
        -(self as i32)
    }

    /// Try to convert from a raw errno value.
    #[must_use]
    pub const fn from_i32(value: i32) -> Option<Self> {
        match value {
            4 => Some(Self::Intr),
            12 => Some(Self::NoMem),
            14 => Some(Self::Fault),
            16 => Some(Self::Busy),
            22 => Some(Self::Inval),
            _ => None,
        }
    }

    /// Symbolic name, as it appears in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Intr => "EINTR",
            Self::NoMem => "ENOMEM",
            Self::Fault => "EFAULT",
            Self::Busy => "EBUSY",
            Self::Inval => "EINVAL",
        }
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_values() {
        assert_eq!(Errno::Intr.as_i32(), 4);
        assert_eq!(Errno::NoMem.as_i32(), 12);
        assert_eq!(Errno::Fault.as_i32(), 14);
        assert_eq!(Errno::NoMem.as_neg_i32(), -12);
    }

    #[test]
    fn test_errno_round_trip() {
        for e in [Errno::Intr, Errno::NoMem, Errno::Fault, Errno::Busy, Errno::Inval] {
            assert_eq!(Errno::from_i32(e.as_i32()), Some(e));
        }
        assert_eq!(Errno::from_i32(0), None);
        assert_eq!(Errno::from_i32(-12), None);
    }

    #[test]
    fn test_errno_display() {
        assert_eq!(format!("{}", Errno::Fault), "EFAULT (14)");
    }
}
