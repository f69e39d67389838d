use tracing::trace;

use donor_core::{Priority, ThreadId};

use crate::queue::{WaitQueue, Waiter};

use super::SchedState;

impl SchedState {
    /// Base priority raised to the highest waiter of every donating queue
    /// the thread owns.
    pub(crate) fn compute_effective(&self, thread: ThreadId) -> Priority {
        let Some(state) = self.threads.get(&thread) else {
            return self.config.default_priority;
        };
        state
            .owns
            .iter()
            .filter_map(|&q| self.queues.get(q).and_then(WaitQueue::highest_level))
            .fold(state.base, Ord::max)
    }

    /// Recompute `start` and walk the ownership chain until nothing changes.
    ///
    /// Each changed thread that is waiting moves to its new bucket, and the
    /// owner of that queue (if it donates) is recomputed next. Ownership
    /// chains are acyclic by contract, so the walk ends.
    pub(crate) fn propagate(&mut self, start: ThreadId) {
        let mut work = vec![start];
        let mut visited = 0usize;
        let mut changed = 0usize;

        while let Some(thread) = work.pop() {
            visited += 1;
            let new = self.compute_effective(thread);
            let Some(state) = self.threads.get_mut(&thread) else {
                continue;
            };
            if state.effective == new {
                continue;
            }
            let old = std::mem::replace(&mut state.effective, new);
            changed += 1;
            trace!(thread = %thread, from = %old, to = %new, "effective priority changed");

            let Some(queue_id) = state.waiting_on else {
                continue;
            };
            let waiter = Waiter {
                thread,
                seq: state.enqueue_seq,
            };
            let queue = self.queue_mut(queue_id);
            queue.reposition(waiter, old, new);
            if let Some(owner) = queue.donee() {
                work.push(owner);
            }
        }

        self.record(|m| m.record_propagation(visited, changed));
    }

    /// Verify the bookkeeping invariants, panicking on the first violation.
    pub(crate) fn check_invariants(&self) {
        for (&thread, state) in &self.threads {
            assert!(
                state.effective >= state.base,
                "{thread}: effective {} below base {}",
                state.effective,
                state.base
            );
            assert_eq!(
                state.effective,
                self.compute_effective(thread),
                "{thread}: stale effective priority"
            );
            if let Some(q) = state.waiting_on {
                let queue = self.queue(q);
                assert!(
                    queue.iter().any(|w| w.thread == thread),
                    "{thread} claims to wait on {q} but is not queued there"
                );
                assert_ne!(queue.owner(), Some(thread), "{thread} waits on {q}, which it owns");
            }
            for &q in &state.owns {
                let queue = self.queue(q);
                assert!(queue.transfer_priority(), "{thread} owns non-donating {q}");
                assert_eq!(queue.owner(), Some(thread), "{thread} owns {q} without holding it");
            }
        }

        let queued = self
            .threads
            .values()
            .filter(|s| s.waiting_on.is_some())
            .count();
        let total: usize = self.queues.iter().map(|(_, q)| q.len()).sum();
        assert_eq!(queued, total, "queue membership out of sync with thread records");
    }
}
