//! Cooperative Scheduler
//!
//! A single run queue of runnable threads, round-robin among them, and
//! the sleep/wake machinery everything else blocks through. A thread
//! keeps the CPU until it sleeps, exits, or calls [`Scheduler::switch`]
//! itself; the only asynchrony is interrupt handlers, which may make
//! threads runnable at any instant.
//!
//! # Interrupt discipline
//!
//! Interrupt handlers call [`Scheduler::make_runnable`] and
//! [`Scheduler::wakeup_on`], so every read or write of the run queue
//! happens at IPL HIGH. Queue internals sit behind
//! [`IplMutex`](wren_arch::sync::IplMutex)es; the public mutators
//! additionally bracket their multi-step transitions in one
//! [`intr::raise`] guard so a handler never observes a half-moved
//! thread. `switch` manages the IPL by hand because it has to *lower*
//! the level to wait for an interrupt when the run queue runs dry.
//!
//! # Thread state machine
//!
//! ```text
//! New -> Runnable -> [running] -> Sleeping | SleepingCancellable
//!           ^                          |
//!           +------- wakeup/cancel ----+      [running] -> Exited
//! ```

use alloc::sync::Arc;

use spin::Once;

use wren_arch::context::context_switch;
use wren_arch::intr::{self, Ipl};
use wren_arch::sync::IplMutex;
use wren_common::Errno;

use crate::task::{KThread, Process, ThreadState};

pub mod queue;

pub use queue::WaitQueue;

/// The scheduler: the run queue plus the current-thread slot.
///
/// One instance exists for the machine, published through [`init`];
/// tests construct their own.
pub struct Scheduler {
    runq: WaitQueue,
    current: IplMutex<Option<Arc<KThread>>>,
}

impl Scheduler {
    /// Create a scheduler with an empty run queue and no current thread.
    #[must_use]
    pub fn new() -> Self {
        Self {
            runq: WaitQueue::new(),
            current: IplMutex::new(None),
        }
    }

    /// Install the boot thread as current without queueing it.
    ///
    /// The boot path calls this once, before the first `switch`, so the
    /// switch has a context to save the outgoing state into.
    pub fn bootstrap(&self, thread: &Arc<KThread>) {
        let _ipl = intr::raise();
        let mut current = self.current.lock();
        assert!(
            current.is_none(),
            "scheduler already has a current thread"
        );
        {
            let mut inner = thread.sched_state();
            assert!(inner.wchan.is_none());
            inner.state = ThreadState::Runnable;
        }
        *current = Some(thread.clone());
    }

    /// The currently executing thread.
    #[must_use]
    pub fn current_thread(&self) -> Option<Arc<KThread>> {
        self.current.lock().clone()
    }

    /// The process of the currently executing thread.
    #[must_use]
    pub fn current_process(&self) -> Option<Arc<Process>> {
        self.current_thread().map(|t| t.process().clone())
    }

    /// Mark a thread runnable and put it on the run queue.
    ///
    /// Callable from interrupt context.
    pub fn make_runnable(&self, thread: &Arc<KThread>) {
        let _ipl = intr::raise();
        {
            let mut inner = thread.sched_state();
            assert!(
                inner.state != ThreadState::Exited,
                "cannot wake an exited thread"
            );
            inner.state = ThreadState::Runnable;
        }
        self.runq.enqueue(thread);
    }

    /// Block the current thread on `q` until something wakes it.
    ///
    /// The sleep is not cancellable: only [`Scheduler::wakeup_on`] or
    /// [`Scheduler::broadcast_on`] on `q` releases the thread.
    pub fn sleep_on(&self, q: &WaitQueue) {
        let current = self.current_thread().expect("sleep with no current thread");
        {
            let _ipl = intr::raise();
            current.sched_state().state = ThreadState::Sleeping;
            q.enqueue(&current);
        }
        self.switch();
    }

    /// Block the current thread on `q`; the sleep can be cancelled.
    ///
    /// If the thread was already cancelled, returns `Err(EINTR)` without
    /// enqueueing or switching. Otherwise the call sleeps and returns
    /// `Ok(())` on wakeup, **including a wakeup caused by
    /// [`Scheduler::cancel`]**. Callers that need to distinguish a
    /// cancellation from an ordinary wake check
    /// [`KThread::cancelled`](crate::task::KThread::cancelled) after the
    /// call; re-entering the sleep with the flag set yields the
    /// `Err(EINTR)` instead.
    pub fn cancellable_sleep_on(&self, q: &WaitQueue) -> Result<(), Errno> {
        let current = self.current_thread().expect("sleep with no current thread");
        {
            let _ipl = intr::raise();
            let mut inner = current.sched_state();
            if inner.cancelled {
                return Err(Errno::Intr);
            }
            inner.state = ThreadState::SleepingCancellable;
            drop(inner);
            q.enqueue(&current);
        }
        self.switch();
        Ok(())
    }

    /// Wake the longest sleeper on `q`, if any.
    ///
    /// Callable from interrupt context.
    pub fn wakeup_on(&self, q: &WaitQueue) -> Option<Arc<KThread>> {
        let _ipl = intr::raise();
        assert!(
            !q.same_channel(&self.runq),
            "run queue threads are runnable; waking them is a state error"
        );
        let thread = q.dequeue()?;
        debug_assert!(thread.sched_state().state.is_sleeping());
        self.make_runnable(&thread);
        Some(thread)
    }

    /// Wake every sleeper on `q`, in FIFO order.
    pub fn broadcast_on(&self, q: &WaitQueue) {
        let _ipl = intr::raise();
        while self.wakeup_on(q).is_some() {}
    }

    /// Cancel a thread. Idempotent; the flag is sticky.
    ///
    /// A thread in cancellable sleep is pulled off its wait channel and
    /// made runnable. In every other state only the flag is set: the
    /// thread observes it at its next cancellable sleep.
    pub fn cancel(&self, thread: &Arc<KThread>) {
        let _ipl = intr::raise();
        let channel = {
            let mut inner = thread.sched_state();
            inner.cancelled = true;
            if inner.state == ThreadState::SleepingCancellable {
                Some(
                    inner
                        .wchan
                        .clone()
                        .expect("cancellable sleeper with no wait channel"),
                )
            } else {
                None
            }
        };
        if let Some(weak) = channel {
            let shared = weak
                .upgrade()
                .expect("wait channel dropped while a thread was linked");
            WaitQueue::from_shared(shared).unlink(thread);
            self.make_runnable(thread);
        }
    }

    /// Give up the CPU: run the next thread off the run queue.
    ///
    /// If the run queue is empty every thread is blocked on some
    /// interrupt-driven event, so lower the IPL and halt until an
    /// interrupt refills the queue. The lowering and the halt are atomic
    /// (delivery is hard-disabled across them), otherwise the wakeup
    /// interrupt could land in the gap and the halt would never end.
    ///
    /// Returns (much later) when something switches back into the
    /// calling thread's context, with the caller's IPL restored.
    pub fn switch(&self) {
        let saved = intr::get_ipl();
        intr::set_ipl(Ipl::High);

        while self.runq.is_empty() {
            intr::disable();
            intr::set_ipl(Ipl::Low);
            intr::wait();
            intr::set_ipl(Ipl::High);
        }

        let next = self.runq.dequeue().expect("run queue drained at IPL HIGH");
        debug_assert!(next.sched_state().state == ThreadState::Runnable);

        let prev = {
            let mut current = self.current.lock();
            current
                .replace(next.clone())
                .expect("switch with no current thread")
        };

        let prev_ctx = prev.context_ptr();
        let next_ctx = next.context_ptr().cast_const();
        // SAFETY: IPL is HIGH, so nothing can interrupt the exchange.
        // `prev` is no longer current and `next` not yet running, so
        // neither context is accessed by anything else. A self-switch
        // passes the same context as source and destination, which the
        // primitive tolerates.
        unsafe { context_switch(prev_ctx, next_ctx) };

        intr::set_ipl(saved);
    }

    /// Terminate the current thread. Never returns.
    ///
    /// The exit-on-fault path: records `status` on the process, marks
    /// the thread exited and switches away. An exited thread is never
    /// enqueued again, so the switch cannot come back; if it does, that
    /// is a scheduler bug and the kernel dies loudly.
    pub fn exit_current(&self, status: i32) -> ! {
        let current = self.current_thread().expect("exit with no current thread");
        current.process().set_exit_status(status);
        log::debug!(
            "pid {} exiting with status {}",
            current.process().pid(),
            status
        );
        {
            let _ipl = intr::raise();
            current.sched_state().state = ThreadState::Exited;
        }
        self.switch();
        panic!("exited thread was scheduled again");
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

// -- Boot singleton

static SCHEDULER: Once<Scheduler> = Once::new();

/// Initialise the boot scheduler. Idempotent; returns the instance.
pub fn init() -> &'static Scheduler {
    SCHEDULER.call_once(Scheduler::new)
}

/// The boot scheduler.
///
/// # Panics
///
/// Panics if [`init`] has not run.
pub fn scheduler() -> &'static Scheduler {
    SCHEDULER.get().expect("scheduler not initialised")
}
