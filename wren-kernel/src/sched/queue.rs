//! Wait Queues
//!
//! The queue a blocked thread parks on, and the building block of the
//! run queue itself. FIFO: threads enter at the head and leave from the
//! tail, so the longest sleeper wakes first.
//!
//! A [`WaitQueue`] is a cheap-clone handle over shared state. The queue
//! owns the threads linked on it (strong references in the deque); each
//! linked thread carries a `Weak` back-reference to the shared state as
//! its wait channel. Linking and the back-reference are updated together
//! under the queue's lock, so `wchan.is_some()` and "is linked" never
//! disagree.

use alloc::collections::VecDeque;
use alloc::sync::{Arc, Weak};

use wren_arch::sync::IplMutex;

use crate::task::KThread;

/// Shared state behind a [`WaitQueue`] handle.
pub(crate) struct WaitQueueShared {
    threads: IplMutex<VecDeque<Arc<KThread>>>,
}

/// A FIFO queue of blocked threads.
#[derive(Clone)]
pub struct WaitQueue {
    pub(crate) shared: Arc<WaitQueueShared>,
}

impl WaitQueue {
    /// Create an empty wait queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(WaitQueueShared {
                threads: IplMutex::new(VecDeque::new()),
            }),
        }
    }

    /// Rebuild a handle from the shared state a thread's wait channel
    /// names.
    pub(crate) fn from_shared(shared: Arc<WaitQueueShared>) -> Self {
        Self { shared }
    }

    /// Check if no threads are linked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.threads.lock().is_empty()
    }

    /// Number of linked threads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.threads.lock().len()
    }

    /// Check whether two handles name the same queue.
    #[must_use]
    pub fn same_channel(&self, other: &WaitQueue) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Link a thread at the head of the queue.
    ///
    /// The caller has already put the thread in the matching state.
    /// Panics if the thread is on any queue.
    pub(crate) fn enqueue(&self, thread: &Arc<KThread>) {
        let mut threads = self.shared.threads.lock();
        {
            let mut inner = thread.sched_state();
            assert!(
                inner.wchan.is_none(),
                "thread already linked on a wait channel"
            );
            inner.wchan = Some(Arc::downgrade(&self.shared));
        }
        threads.push_front(thread.clone());
    }

    /// Unlink and return the thread at the tail (the oldest), if any.
    pub(crate) fn dequeue(&self) -> Option<Arc<KThread>> {
        let mut threads = self.shared.threads.lock();
        let thread = threads.pop_back()?;
        {
            let mut inner = thread.sched_state();
            debug_assert!(
                inner
                    .wchan
                    .as_ref()
                    .is_some_and(|w| Weak::as_ptr(w) == Arc::as_ptr(&self.shared)),
                "dequeued thread named a different wait channel"
            );
            inner.wchan = None;
        }
        Some(thread)
    }

    /// Unlink a specific thread, wherever it sits in the queue.
    ///
    /// The cancellation path: the thread named this queue through its
    /// wait channel. Panics if it is not actually linked here.
    pub(crate) fn unlink(&self, thread: &Arc<KThread>) {
        let mut threads = self.shared.threads.lock();
        let pos = threads
            .iter()
            .position(|t| Arc::ptr_eq(t, thread))
            .expect("thread not linked on its named wait channel");
        threads.remove(pos);
        thread.sched_state().wchan = None;
    }

    /// Check whether a specific thread is linked here.
    #[must_use]
    pub fn holds(&self, thread: &Arc<KThread>) -> bool {
        self.shared
            .threads
            .lock()
            .iter()
            .any(|t| Arc::ptr_eq(t, thread))
    }
}

impl Default for WaitQueue {
    fn default() -> Self {
        Self::new()
    }
}
