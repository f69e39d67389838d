//! Priority wait queues.
//!
//! A queue keeps one bucket per priority level. Each bucket is ordered by
//! arrival stamp, so selection is "highest non-empty bucket, earliest
//! arrival", and a waiter whose effective priority changes moves to its new
//! bucket without losing its place in line.

use std::collections::VecDeque;

use donor_core::{Priority, ThreadId, PRIORITY_LEVELS};

use crate::arena::QueueId;
use crate::scheduler::SchedState;

/// The queue interface consumed by synchronization primitives.
pub trait ThreadQueue {
    /// Enqueue `thread` behind every waiter of equal or higher priority.
    ///
    /// # Panics
    ///
    /// Panics if `thread` already waits on any queue or owns this one.
    fn wait_for_access(&mut self, thread: ThreadId);

    /// Take ownership of an unowned queue.
    ///
    /// # Panics
    ///
    /// Panics if the queue already has an owner or `thread` waits on it.
    fn acquire(&mut self, thread: ThreadId);

    /// Remove and return the highest-priority, earliest-arrived waiter.
    ///
    /// If the queue has an owner, ownership moves to the returned thread
    /// (or to nobody when the queue is empty).
    fn next_thread(&mut self) -> Option<ThreadId>;

    fn is_empty(&self) -> bool;
}

/// A thread parked in a queue bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Waiter {
    pub thread: ThreadId,
    pub seq: u64,
}

/// Queue record stored in the scheduler's arena.
#[derive(Debug)]
pub struct WaitQueue {
    transfer_priority: bool,
    buckets: [VecDeque<Waiter>; PRIORITY_LEVELS],
    owner: Option<ThreadId>,
    len: usize,
}

impl WaitQueue {
    pub fn new(transfer_priority: bool) -> Self {
        Self {
            transfer_priority,
            buckets: std::array::from_fn(|_| VecDeque::new()),
            owner: None,
            len: 0,
        }
    }

    pub fn transfer_priority(&self) -> bool {
        self.transfer_priority
    }

    pub fn owner(&self) -> Option<ThreadId> {
        self.owner
    }

    /// Replace the owner, returning the previous one.
    pub fn set_owner(&mut self, owner: Option<ThreadId>) -> Option<ThreadId> {
        std::mem::replace(&mut self.owner, owner)
    }

    /// The owner receiving donations from this queue, if any.
    pub fn donee(&self) -> Option<ThreadId> {
        self.owner.filter(|_| self.transfer_priority)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, level: Priority, waiter: Waiter) {
        let bucket = &mut self.buckets[level.index()];
        let at = bucket.partition_point(|w| w.seq < waiter.seq);
        bucket.insert(at, waiter);
        self.len += 1;
    }

    pub fn remove(&mut self, level: Priority, waiter: Waiter) -> bool {
        let bucket = &mut self.buckets[level.index()];
        match bucket.binary_search_by_key(&waiter.seq, |w| w.seq) {
            Ok(at) if bucket[at].thread == waiter.thread => {
                bucket.remove(at);
                self.len -= 1;
                true
            }
            _ => false,
        }
    }

    /// Move a waiter between buckets after its effective priority changed.
    pub fn reposition(&mut self, waiter: Waiter, from: Priority, to: Priority) {
        assert!(
            self.remove(from, waiter),
            "{} missing from bucket {from}",
            waiter.thread
        );
        self.insert(to, waiter);
    }

    /// Highest priority level that has a waiter.
    pub fn highest_level(&self) -> Option<Priority> {
        Priority::descending().find(|p| !self.buckets[p.index()].is_empty())
    }

    pub fn peek(&self) -> Option<Waiter> {
        let level = self.highest_level()?;
        self.buckets[level.index()].front().copied()
    }

    pub fn pop(&mut self) -> Option<Waiter> {
        let level = self.highest_level()?;
        let waiter = self.buckets[level.index()].pop_front()?;
        self.len -= 1;
        Some(waiter)
    }

    /// Waiters in selection order.
    pub fn iter(&self) -> impl Iterator<Item = Waiter> + '_ {
        Priority::descending().flat_map(move |p| self.buckets[p.index()].iter().copied())
    }
}

/// Mutable view of one queue inside a [`Section`](crate::Section).
pub struct QueueMut<'s> {
    pub(crate) state: &'s mut SchedState,
    pub(crate) id: QueueId,
}

impl QueueMut<'_> {
    pub fn id(&self) -> QueueId {
        self.id
    }

    pub fn owner(&self) -> Option<ThreadId> {
        self.state.queue(self.id).owner()
    }

    pub fn transfers_priority(&self) -> bool {
        self.state.queue(self.id).transfer_priority()
    }

    pub fn len(&self) -> usize {
        self.state.queue(self.id).len()
    }

    /// The thread `next_thread` would return, without removing it.
    pub fn peek(&self) -> Option<ThreadId> {
        self.state.queue(self.id).peek().map(|w| w.thread)
    }

    /// Waiting threads in the order `next_thread` would return them.
    pub fn waiters(&self) -> Vec<ThreadId> {
        self.state.queue(self.id).iter().map(|w| w.thread).collect()
    }
}

impl ThreadQueue for QueueMut<'_> {
    fn wait_for_access(&mut self, thread: ThreadId) {
        self.state.wait_for_access(self.id, thread);
    }

    fn acquire(&mut self, thread: ThreadId) {
        self.state.acquire(self.id, thread);
    }

    fn next_thread(&mut self) -> Option<ThreadId> {
        self.state.next_thread(self.id)
    }

    fn is_empty(&self) -> bool {
        self.state.queue(self.id).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn waiter(thread: u64, seq: u64) -> Waiter {
        Waiter {
            thread: ThreadId(thread),
            seq,
        }
    }

    fn p(v: u8) -> Priority {
        Priority::from_raw(v)
    }

    #[test]
    fn pop_prefers_higher_bucket() {
        let mut q = WaitQueue::new(false);
        q.insert(p(2), waiter(1, 1));
        q.insert(p(5), waiter(2, 2));
        assert_eq!(q.highest_level(), Some(p(5)));
        assert_eq!(q.pop(), Some(waiter(2, 2)));
        assert_eq!(q.pop(), Some(waiter(1, 1)));
        assert_eq!(q.pop(), None);
        assert!(q.is_empty());
    }

    #[test]
    fn bucket_is_fifo_by_arrival() {
        let mut q = WaitQueue::new(false);
        q.insert(p(3), waiter(1, 10));
        q.insert(p(3), waiter(2, 11));
        q.insert(p(3), waiter(3, 12));
        let order: Vec<u64> = q.iter().map(|w| w.thread.0).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn reposition_keeps_arrival_order() {
        let mut q = WaitQueue::new(true);
        q.insert(p(4), waiter(1, 1));
        q.insert(p(2), waiter(2, 2));
        q.insert(p(4), waiter(3, 3));

        // Thread 2 rises into bucket 4 and lands between 1 and 3.
        q.reposition(waiter(2, 2), p(2), p(4));
        let order: Vec<u64> = q.iter().map(|w| w.thread.0).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert_eq!(q.len(), 3);
    }

    #[test]
    fn remove_requires_matching_thread() {
        let mut q = WaitQueue::new(false);
        q.insert(p(1), waiter(1, 7));
        assert!(!q.remove(p(1), waiter(2, 7)));
        assert!(!q.remove(p(2), waiter(1, 7)));
        assert!(q.remove(p(1), waiter(1, 7)));
        assert!(q.is_empty());
    }

    #[test]
    fn donee_requires_transfer() {
        let mut plain = WaitQueue::new(false);
        plain.set_owner(Some(ThreadId(9)));
        assert_eq!(plain.donee(), None);

        let mut donating = WaitQueue::new(true);
        assert_eq!(donating.set_owner(Some(ThreadId(9))), None);
        assert_eq!(donating.donee(), Some(ThreadId(9)));
    }

    #[test]
    fn peek_does_not_remove() {
        let mut q = WaitQueue::new(false);
        q.insert(p(0), waiter(1, 1));
        assert_eq!(q.peek(), Some(waiter(1, 1)));
        assert_eq!(q.len(), 1);
    }
}
