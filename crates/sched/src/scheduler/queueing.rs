use tracing::debug;

use donor_core::ThreadId;

use crate::arena::QueueId;
use crate::queue::{WaitQueue, Waiter};

use super::SchedState;

impl SchedState {
    pub(crate) fn new_queue(&mut self, transfer_priority: bool) -> QueueId {
        let id = self.queues.insert(WaitQueue::new(transfer_priority));
        self.record(|m| m.queues_created += 1);
        debug!(queue = %id, transfer_priority, "queue created");
        id
    }

    /// Release a queue. Its owner stops receiving donations from it.
    pub(crate) fn discard_queue(&mut self, id: QueueId) {
        let queue = self.queue(id);
        assert!(
            queue.is_empty(),
            "queue {id} discarded with {} waiter(s)",
            queue.len()
        );
        let donee = queue.donee();
        self.queues.remove(id);
        self.record(|m| m.queues_discarded += 1);
        debug!(queue = %id, "queue discarded");

        if let Some(owner) = donee {
            if let Some(state) = self.threads.get_mut(&owner) {
                state.remove_owned(id);
            }
            self.propagate(owner);
        }
    }

    pub(crate) fn wait_for_access(&mut self, id: QueueId, thread: ThreadId) {
        let owner = self.queue(id).owner();
        assert_ne!(owner, Some(thread), "{thread} cannot wait on {id}, which it owns");

        let seq = self.next_seq;
        let state = self.thread_mut(thread);
        assert!(
            state.waiting_on.is_none(),
            "{thread} is already waiting on {:?}",
            state.waiting_on
        );
        state.waiting_on = Some(id);
        state.enqueue_seq = seq;
        let level = state.effective;
        self.next_seq += 1;

        let queue = self.queue_mut(id);
        queue.insert(level, Waiter { thread, seq });
        let donee = queue.donee();
        self.record(|m| m.enqueues += 1);
        debug!(thread = %thread, queue = %id, priority = %level, seq, "waiting for access");

        if let Some(owner) = donee {
            self.propagate(owner);
        }
    }

    pub(crate) fn acquire(&mut self, id: QueueId, thread: ThreadId) {
        let queue = self.queue(id);
        if let Some(owner) = queue.owner() {
            panic!("{thread} cannot acquire {id}: already owned by {owner}");
        }
        let transfer = queue.transfer_priority();

        let state = self.thread_mut(thread);
        assert_ne!(
            state.waiting_on,
            Some(id),
            "{thread} cannot acquire {id} while waiting on it"
        );
        if transfer {
            state.add_owned(id);
        }
        self.queue_mut(id).set_owner(Some(thread));
        debug!(thread = %thread, queue = %id, "acquired");

        if transfer {
            self.propagate(thread);
        }
    }

    pub(crate) fn next_thread(&mut self, id: QueueId) -> Option<ThreadId> {
        let queue = self.queue_mut(id);
        let selected = queue.pop().map(|w| w.thread);
        let transfer = queue.transfer_priority();
        let previous = queue.owner();
        if previous.is_some() {
            queue.set_owner(selected);
        }

        if let Some(thread) = selected {
            self.thread_mut(thread).waiting_on = None;
            self.record(|m| m.selections += 1);
        }

        let Some(previous) = previous else {
            debug!(queue = %id, selected = ?selected, "next thread");
            return selected;
        };
        self.record(|m| m.handoffs += 1);
        debug!(queue = %id, from = %previous, to = ?selected, "ownership handed off");

        if transfer {
            if let Some(state) = self.threads.get_mut(&previous) {
                state.remove_owned(id);
            }
            self.propagate(previous);
            if let Some(thread) = selected {
                self.thread_mut(thread).add_owned(id);
                self.propagate(thread);
            }
        }
        selected
    }
}
