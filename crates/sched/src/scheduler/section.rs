use std::sync::MutexGuard;

use donor_core::{Priority, ThreadId};

use crate::arena::QueueId;
use crate::metrics::SchedulerMetrics;
use crate::queue::QueueMut;

use super::SchedState;

/// Exclusive access to the scheduler.
///
/// While a `Section` is alive no other scheduling activity can run, so every
/// method below executes as one atomic step. None of them block. Drop the
/// section before suspending a thread.
pub struct Section<'a> {
    state: MutexGuard<'a, SchedState>,
}

impl<'a> Section<'a> {
    pub(crate) fn new(state: MutexGuard<'a, SchedState>) -> Self {
        Self { state }
    }

    // ── Queues ──────────────────────────────────────────────────

    /// Allocate an empty queue. With `transfer_priority`, waiters donate
    /// their priority to whoever owns the queue.
    pub fn new_thread_queue(&mut self, transfer_priority: bool) -> QueueId {
        self.state.new_queue(transfer_priority)
    }

    /// Operate on one queue through the [`ThreadQueue`](crate::ThreadQueue) interface.
    ///
    /// # Panics
    ///
    /// Panics if the queue was discarded.
    pub fn queue(&mut self, id: QueueId) -> QueueMut<'_> {
        assert!(self.state.queues.contains(id), "queue {id} used after it was discarded");
        QueueMut {
            state: &mut *self.state,
            id,
        }
    }

    /// Release a queue that has no waiters.
    ///
    /// # Panics
    ///
    /// Panics if threads are still waiting on it.
    pub fn discard_queue(&mut self, id: QueueId) {
        self.state.discard_queue(id);
    }

    pub fn owner(&self, id: QueueId) -> Option<ThreadId> {
        self.state.queue(id).owner()
    }

    pub fn transfers_priority(&self, id: QueueId) -> bool {
        self.state.queue(id).transfer_priority()
    }

    pub fn is_empty(&self, id: QueueId) -> bool {
        self.state.queue(id).is_empty()
    }

    /// Waiting threads in selection order.
    pub fn waiters(&self, id: QueueId) -> Vec<ThreadId> {
        self.state.queue(id).iter().map(|w| w.thread).collect()
    }

    pub fn queue_count(&self) -> usize {
        self.state.queues.len()
    }

    // ── Threads ─────────────────────────────────────────────────

    pub fn priority(&self, thread: ThreadId) -> Priority {
        self.state.priority(thread)
    }

    /// Change the base priority and propagate the effect along the
    /// ownership chain. Setting the current value is a no-op.
    pub fn set_priority(&mut self, thread: ThreadId, priority: Priority) {
        self.state.set_priority(thread, priority);
    }

    /// Base priority raised by every donation currently reaching `thread`.
    pub fn effective_priority(&self, thread: ThreadId) -> Priority {
        self.state.effective_priority(thread)
    }

    /// Raise base priority by one. Returns `false` at [`Priority::MAX`].
    pub fn increase_priority(&mut self, thread: ThreadId) -> bool {
        self.state.increase_priority(thread)
    }

    /// Lower base priority by one. Returns `false` at [`Priority::MIN`].
    pub fn decrease_priority(&mut self, thread: ThreadId) -> bool {
        self.state.decrease_priority(thread)
    }

    pub fn waiting_on(&self, thread: ThreadId) -> Option<QueueId> {
        self.state.threads.get(&thread).and_then(|s| s.waiting_on)
    }

    /// Donating queues currently owned by `thread`.
    pub fn owned_queues(&self, thread: ThreadId) -> Vec<QueueId> {
        self.state
            .threads
            .get(&thread)
            .map(|s| s.owns.clone())
            .unwrap_or_default()
    }

    /// Forget a terminated thread. Queues it owned become ownerless.
    ///
    /// # Panics
    ///
    /// Panics if the thread is still waiting on a queue, or owns a queue
    /// that still has waiters.
    pub fn thread_finished(&mut self, thread: ThreadId) {
        self.state.thread_finished(thread);
    }

    pub fn thread_count(&self) -> usize {
        self.state.threads.len()
    }

    // ── Diagnostics ─────────────────────────────────────────────

    pub fn metrics(&self) -> SchedulerMetrics {
        self.state.metrics.clone()
    }

    /// Panic if any bookkeeping invariant is broken.
    pub fn check_invariants(&self) {
        self.state.check_invariants();
    }
}
