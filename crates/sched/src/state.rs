use donor_core::Priority;

use crate::arena::QueueId;

/// Per-thread scheduling record.
///
/// Created the first time the scheduler mutates anything about a thread and
/// dropped when the runtime reports the thread finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadState {
    /// Explicitly assigned priority.
    pub base: Priority,
    /// `base` raised by donations from owned queues. Never below `base`.
    pub effective: Priority,
    /// Arrival stamp of the most recent `wait_for_access`.
    pub enqueue_seq: u64,
    /// Queue this thread is currently a waiter on.
    pub waiting_on: Option<QueueId>,
    /// Donating queues this thread currently owns.
    pub owns: Vec<QueueId>,
}

impl ThreadState {
    pub fn new(base: Priority) -> Self {
        Self {
            base,
            effective: base,
            enqueue_seq: 0,
            waiting_on: None,
            owns: Vec::new(),
        }
    }

    pub fn add_owned(&mut self, queue: QueueId) {
        if !self.owns.contains(&queue) {
            self.owns.push(queue);
        }
    }

    /// Returns whether the queue was in the owned set.
    pub fn remove_owned(&mut self, queue: QueueId) -> bool {
        let before = self.owns.len();
        self.owns.retain(|&q| q != queue);
        self.owns.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;

    #[test]
    fn new_state_starts_at_base() {
        let state = ThreadState::new(Priority::from_raw(3));
        assert_eq!(state.effective, Priority::from_raw(3));
        assert_eq!(state.waiting_on, None);
        assert!(state.owns.is_empty());
    }

    #[test]
    fn owned_set_has_no_duplicates() {
        let mut arena = Arena::new();
        let q = arena.insert(());
        let mut state = ThreadState::new(Priority::DEFAULT);
        state.add_owned(q);
        state.add_owned(q);
        assert_eq!(state.owns, vec![q]);
        assert!(state.remove_owned(q));
        assert!(!state.remove_owned(q));
    }
}
