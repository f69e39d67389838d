use std::sync::Arc;

use tracing::{trace, warn};

use donor_core::ThreadId;

use crate::arena::QueueId;
use crate::queue::ThreadQueue;
use crate::scheduler::Scheduler;

use super::runtime::ThreadRuntime;

/// Mutual-exclusion lock whose waiters donate priority to the holder.
///
/// The holder is the owner of a donating queue. Releasing hands the lock
/// straight to the highest-priority waiter.
pub struct Lock {
    pub(super) scheduler: Arc<Scheduler>,
    pub(super) runtime: Arc<dyn ThreadRuntime>,
    pub(super) queue: QueueId,
}

impl Lock {
    pub fn new(scheduler: Arc<Scheduler>, runtime: Arc<dyn ThreadRuntime>) -> Self {
        let queue = scheduler.section().new_thread_queue(true);
        Self {
            scheduler,
            runtime,
            queue,
        }
    }

    pub fn queue_id(&self) -> QueueId {
        self.queue
    }

    pub fn holder(&self) -> Option<ThreadId> {
        self.scheduler.section().owner(self.queue)
    }

    pub fn is_held_by_current_thread(&self) -> bool {
        self.holder() == Some(self.runtime.current_thread())
    }

    /// Block until the calling thread holds the lock.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread already holds it.
    pub fn acquire(&self) {
        let me = self.runtime.current_thread();
        {
            let mut section = self.scheduler.section();
            let mut queue = section.queue(self.queue);
            match queue.owner() {
                None => {
                    queue.acquire(me);
                    return;
                }
                Some(holder) => {
                    assert_ne!(holder, me, "{me} tried to re-acquire a lock it holds");
                    queue.wait_for_access(me);
                }
            }
        }
        trace!(thread = %me, queue = %self.queue, "blocked on lock");
        while self.holder() != Some(me) {
            self.runtime.sleep();
        }
    }

    /// Hand the lock to the next waiter, or leave it free.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread does not hold the lock.
    pub fn release(&self) {
        let me = self.runtime.current_thread();
        let next = {
            let mut section = self.scheduler.section();
            let mut queue = section.queue(self.queue);
            assert_eq!(queue.owner(), Some(me), "{me} released a lock it does not hold");
            queue.next_thread()
        };
        if let Some(thread) = next {
            self.runtime.ready(thread);
        }
    }

    /// Acquire and release on drop.
    pub fn lock(&self) -> LockGuard<'_> {
        self.acquire();
        LockGuard { lock: self }
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        let mut section = self.scheduler.section();
        if section.is_empty(self.queue) {
            section.discard_queue(self.queue);
        } else {
            warn!(
                queue = %self.queue,
                waiters = ?section.waiters(self.queue),
                "lock dropped with waiters; queue left in place"
            );
        }
    }
}

/// Holds a [`Lock`] until dropped.
pub struct LockGuard<'a> {
    lock: &'a Lock,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}
