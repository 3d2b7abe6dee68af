//! Kernel Threads
//!
//! The schedulable unit. A thread owns its saved machine context and a
//! back-pointer to its process; its scheduling state (run state, sticky
//! cancellation flag, wait-channel back-reference) sits behind an
//! [`IplMutex`] because interrupt handlers wake threads.
//!
//! # Ownership
//!
//! A sleeping thread is kept alive by the wait queue it is linked on:
//! the queue holds the strong reference, the thread holds only a `Weak`
//! back-reference naming the channel. The back-reference exists for
//! lookup and invariant checking; it never keeps a queue alive.

use alloc::sync::{Arc, Weak};
use core::cell::UnsafeCell;

use wren_arch::context::Context;
use wren_arch::sync::{IplMutex, IplMutexGuard};

use crate::sched::queue::{WaitQueue, WaitQueueShared};

mod process;

pub use process::{Pid, Process};

/// Run state of a kernel thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadState {
    /// Created, not yet handed to the scheduler.
    New,
    /// On the run queue, or currently executing.
    Runnable,
    /// Blocked on a wait channel; only an explicit wakeup releases it.
    Sleeping,
    /// Blocked on a wait channel; a wakeup or a cancellation releases it.
    SleepingCancellable,
    /// Finished. Never scheduled again.
    Exited,
}

impl ThreadState {
    /// Check whether this is one of the two blocked states.
    #[inline]
    #[must_use]
    pub const fn is_sleeping(self) -> bool {
        matches!(self, Self::Sleeping | Self::SleepingCancellable)
    }
}

/// Mutable scheduling state of a thread.
///
/// Invariant: `wchan` is `Some` exactly while the thread is linked on
/// that queue's deque.
pub(crate) struct ThreadInner {
    pub(crate) state: ThreadState,
    pub(crate) cancelled: bool,
    pub(crate) wchan: Option<Weak<WaitQueueShared>>,
}

/// A kernel thread.
///
/// Created by the thread-creation path (outside the core) and handed to
/// the scheduler with
/// [`Scheduler::make_runnable`](crate::sched::Scheduler::make_runnable).
pub struct KThread {
    proc: Arc<Process>,
    ctx: UnsafeCell<Context>,
    inner: IplMutex<ThreadInner>,
}

// SAFETY: the context cell is only touched inside the scheduler's switch
// path, at IPL HIGH on the single CPU; everything else is behind the
// IplMutex.
unsafe impl Send for KThread {}
unsafe impl Sync for KThread {}

impl KThread {
    /// Create a thread belonging to `proc`, in the
    /// [`New`](ThreadState::New) state with an empty context.
    #[must_use]
    pub fn new(proc: Arc<Process>) -> Arc<Self> {
        Arc::new(Self {
            proc,
            ctx: UnsafeCell::new(Context::new()),
            inner: IplMutex::new(ThreadInner {
                state: ThreadState::New,
                cancelled: false,
                wchan: None,
            }),
        })
    }

    /// The owning process.
    #[inline]
    #[must_use]
    pub fn process(&self) -> &Arc<Process> {
        &self.proc
    }

    /// Current run state.
    #[must_use]
    pub fn state(&self) -> ThreadState {
        self.inner.lock().state
    }

    /// Whether the thread has ever been cancelled. Sticky.
    #[must_use]
    pub fn cancelled(&self) -> bool {
        self.inner.lock().cancelled
    }

    /// The wait channel this thread is linked on, if any.
    #[must_use]
    pub fn wait_channel(&self) -> Option<WaitQueue> {
        self.inner
            .lock()
            .wchan
            .as_ref()
            .and_then(Weak::upgrade)
            .map(WaitQueue::from_shared)
    }

    /// Borrow the scheduling state.
    pub(crate) fn sched_state(&self) -> IplMutexGuard<'_, ThreadInner> {
        self.inner.lock()
    }

    /// Raw pointer to the saved context.
    ///
    /// Only the switch path may dereference this, at IPL HIGH.
    pub(crate) fn context_ptr(&self) -> *mut Context {
        self.ctx.get()
    }
}
