//! Interrupt-safe synchronisation
//!
//! Provides [`IplMutex`], a spinlock that raises the IPL to
//! [`Ipl::High`](crate::intr::Ipl::High) while held. Every structure the
//! kernel shares between thread context and interrupt context (run queue,
//! wait queues, line-discipline buffers) lives behind one of these: the
//! borrow *is* the critical section, replacing the open-coded
//! save/raise/restore idiom at each call site.
//!
//! # Example
//!
//! ```ignore
//! use wren_arch::sync::IplMutex;
//!
//! static COUNTER: IplMutex<u64> = IplMutex::new(0);
//!
//! fn increment() {
//!     let mut guard = COUNTER.lock();
//!     *guard += 1;
//! }   // IPL restored here
//! ```

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

use crate::intr::{self, Ipl};

/// A spinlock that holds the IPL at HIGH while locked.
///
/// Interrupt handlers mutate the same queues threads do. A plain
/// spinlock deadlocks on a single CPU the moment a handler interrupts a
/// lock holder and spins on the same lock; raising the IPL before
/// acquiring closes that window.
///
/// # Safety Invariants
///
/// - The lock must be released (and the IPL restored) before sleeping or
///   calling anything that may sleep
/// - Critical sections should be kept short
/// - Nested locking composes: each guard restores the level it saved
pub struct IplMutex<T> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
}

// SAFETY: IplMutex provides synchronisation for its data. The data is
// only accessible through the guard, which requires holding the lock.
unsafe impl<T: Send> Sync for IplMutex<T> {}
unsafe impl<T: Send> Send for IplMutex<T> {}

impl<T> IplMutex<T> {
    /// Create a new mutex with the given value.
    #[must_use]
    pub const fn new(value: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(value),
        }
    }

    /// Acquire the lock, raising the IPL to HIGH.
    ///
    /// Returns a guard that restores the saved IPL when dropped.
    #[must_use]
    pub fn lock(&self) -> IplMutexGuard<'_, T> {
        // Raise the IPL BEFORE attempting to acquire: an interrupt that
        // fires while we spin could otherwise try to take this same lock.
        let saved = intr::get_ipl();
        intr::set_ipl(Ipl::High);

        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            core::hint::spin_loop();
        }

        IplMutexGuard {
            mutex: self,
            saved,
            _not_send: core::marker::PhantomData,
        }
    }

    /// Try to acquire the lock without spinning.
    ///
    /// Returns `None` if the lock is already held. The IPL is only left
    /// raised if the lock is acquired.
    #[must_use]
    pub fn try_lock(&self) -> Option<IplMutexGuard<'_, T>> {
        let saved = intr::get_ipl();
        intr::set_ipl(Ipl::High);

        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Some(IplMutexGuard {
                mutex: self,
                saved,
                _not_send: core::marker::PhantomData,
            })
        } else {
            intr::set_ipl(saved);
            None
        }
    }

    /// Get a mutable reference to the underlying data.
    ///
    /// Safe because `&mut self` guarantees exclusive access.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Consume the mutex and return the inner value.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: Default> Default for IplMutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: core::fmt::Debug> core::fmt::Debug for IplMutex<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.try_lock() {
            Some(guard) => f.debug_struct("IplMutex").field("data", &*guard).finish(),
            None => f.debug_struct("IplMutex").field("data", &"<locked>").finish(),
        }
    }
}

/// Guard providing access to the locked data.
///
/// The IPL stays at HIGH while this guard exists. Dropping it releases
/// the lock and restores the saved level.
///
/// `!Send`: moving the guard to another thread would restore the IPL of
/// the wrong CPU.
pub struct IplMutexGuard<'a, T> {
    mutex: &'a IplMutex<T>,
    saved: Ipl,
    // Marker to make the guard !Send (raw pointers are !Send)
    _not_send: core::marker::PhantomData<*const ()>,
}

impl<'a, T> Deref for IplMutexGuard<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: We hold the lock, so we have exclusive access
        unsafe { &*self.mutex.data.get() }
    }
}

impl<'a, T> DerefMut for IplMutexGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: We hold the lock, so we have exclusive access
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<'a, T> Drop for IplMutexGuard<'a, T> {
    fn drop(&mut self) {
        // Release before restoring the IPL, so an interrupt delivered at
        // the lower level never observes the lock still held.
        self.mutex.locked.store(false, Ordering::Release);
        core::sync::atomic::fence(Ordering::SeqCst);
        intr::set_ipl(self.saved);
    }
}

unsafe impl<T: Sync> Sync for IplMutexGuard<'_, T> {}
