//! Interrupt Priority Level
//!
//! The kernel is single-CPU and cooperative: the only concurrency it has
//! to defend against is an interrupt handler running in the middle of a
//! thread. The defence is the interrupt priority level (IPL): at
//! [`Ipl::High`] all maskable interrupts are held off, at [`Ipl::Low`]
//! they are delivered. IPL is per-thread state; the machine-context save
//! area carries it across context switches.
//!
//! # Backends
//!
//! The IPL operations are routed through an installed [`IntrBackend`].
//! Boot code on AArch64 installs [`DaifIntr`], which maps the IPL onto
//! the DAIF mask bits. Until a backend is installed (and always on hosted
//! builds) the operations fall back to [`SoftIntr`], a software model
//! that tracks the level in an atomic. `SoftIntr` has no interrupt
//! sources, so its [`wait`] panics: a scheduler that waits for an
//! interrupt that cannot arrive has deadlocked, and a hosted test that
//! reaches this state should fail loudly.

use core::sync::atomic::{AtomicU8, Ordering};

use spin::Once;

/// Interrupt priority level.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ipl {
    /// All maskable interrupts delivered.
    Low = 0,
    /// All maskable interrupts held off.
    High = 1,
}

/// The operations an IPL implementation must provide.
///
/// `disable`/`enable` are the hard mask used around [`wait`]: lowering
/// the IPL and halting must be atomic, or a wakeup interrupt could fire
/// in the gap and the CPU would halt with nothing left to wake it.
pub trait IntrBackend: Sync {
    /// Read the current IPL.
    fn ipl(&self) -> Ipl;

    /// Set the IPL.
    fn set_ipl(&self, to: Ipl);

    /// Hard-disable interrupt delivery, regardless of IPL.
    fn disable(&self);

    /// Re-enable interrupt delivery gated by the IPL.
    fn enable(&self);

    /// Halt until the next interrupt fires.
    ///
    /// Must be called with delivery hard-disabled; the halt re-enables
    /// delivery atomically with the wait.
    fn wait(&self);
}

static BACKEND: Once<&'static dyn IntrBackend> = Once::new();
static SOFT: SoftIntr = SoftIntr::new();

/// Install the interrupt backend.
///
/// Called once during boot, before the scheduler starts switching.
/// Subsequent calls are ignored.
pub fn install(backend: &'static dyn IntrBackend) {
    BACKEND.call_once(|| backend);
}

#[inline]
fn backend() -> &'static dyn IntrBackend {
    match BACKEND.get() {
        Some(b) => *b,
        None => &SOFT,
    }
}

/// Read the current IPL.
#[inline]
#[must_use]
pub fn get_ipl() -> Ipl {
    backend().ipl()
}

/// Set the IPL.
#[inline]
pub fn set_ipl(to: Ipl) {
    backend().set_ipl(to);
}

/// Hard-disable interrupt delivery.
#[inline]
pub fn disable() {
    backend().disable();
}

/// Re-enable interrupt delivery.
#[inline]
pub fn enable() {
    backend().enable();
}

/// Halt until the next interrupt.
#[inline]
pub fn wait() {
    backend().wait();
}

/// Raise the IPL to [`Ipl::High`], restoring the previous level on drop.
///
/// The save/raise/restore idiom as an RAII critical section. Inside an
/// interrupt handler the section is already entered implicitly; taking a
/// guard there is a harmless High-to-High transition.
#[must_use]
pub fn raise() -> IplGuard {
    let saved = get_ipl();
    set_ipl(Ipl::High);
    IplGuard { saved }
}

/// Guard returned by [`raise`]. Restores the saved IPL when dropped.
pub struct IplGuard {
    saved: Ipl,
}

impl Drop for IplGuard {
    fn drop(&mut self) {
        set_ipl(self.saved);
    }
}

// -- Software backend

/// Software IPL model.
///
/// The default backend on hosted builds and before boot installs a real
/// one. Tracks the level in an atomic; has no interrupt sources, so
/// [`IntrBackend::wait`] panics: reaching it means the run queue is
/// empty with nothing left that could refill it.
pub struct SoftIntr {
    level: AtomicU8,
}

impl SoftIntr {
    /// Create a new software backend, starting at [`Ipl::High`] (the
    /// state a CPU boots in).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            level: AtomicU8::new(Ipl::High as u8),
        }
    }
}

impl Default for SoftIntr {
    fn default() -> Self {
        Self::new()
    }
}

impl IntrBackend for SoftIntr {
    fn ipl(&self) -> Ipl {
        if self.level.load(Ordering::Acquire) == Ipl::Low as u8 {
            Ipl::Low
        } else {
            Ipl::High
        }
    }

    fn set_ipl(&self, to: Ipl) {
        self.level.store(to as u8, Ordering::Release);
    }

    fn disable(&self) {}

    fn enable(&self) {}

    fn wait(&self) {
        panic!("interrupt wait with no interrupt source: all threads are blocked");
    }
}

// -- AArch64 backend

#[cfg(target_arch = "aarch64")]
mod daif {
    use aarch64_cpu::registers::*;
    use core::arch::asm;

    use super::{IntrBackend, Ipl};

    /// DAIF bit for IRQ masking.
    const DAIF_I: u64 = 1 << 7;

    /// IPL over the AArch64 DAIF mask bits.
    ///
    /// [`Ipl::High`](super::Ipl::High) masks IRQs; the hard disable used
    /// around `wfi` masks everything.
    pub struct DaifIntr;

    impl IntrBackend for DaifIntr {
        fn ipl(&self) -> Ipl {
            if DAIF.get() & DAIF_I != 0 {
                Ipl::High
            } else {
                Ipl::Low
            }
        }

        fn set_ipl(&self, to: Ipl) {
            // SAFETY: Modifying DAIF is safe in kernel mode
            unsafe {
                match to {
                    Ipl::High => asm!("msr daifset, #2", options(nomem, nostack)),
                    Ipl::Low => asm!("msr daifclr, #2", options(nomem, nostack)),
                }
            }
        }

        fn disable(&self) {
            // SAFETY: Modifying DAIF is safe in kernel mode
            unsafe {
                asm!("msr daifset, #0xf", options(nomem, nostack));
            }
        }

        fn enable(&self) {
            // SAFETY: Modifying DAIF is safe in kernel mode
            unsafe {
                asm!("msr daifclr, #0xf", options(nomem, nostack));
            }
        }

        fn wait(&self) {
            // WFI wakes on a pending interrupt even while delivery is
            // masked; the handler runs once the caller re-enables.
            // SAFETY: WFI is always safe to call
            unsafe {
                asm!("wfi", options(nomem, nostack));
            }
        }
    }
}

#[cfg(target_arch = "aarch64")]
pub use daif::DaifIntr;
