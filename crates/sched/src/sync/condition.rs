use std::sync::Arc;

use tracing::{trace, warn};

use donor_core::ThreadId;

use crate::arena::QueueId;
use crate::queue::ThreadQueue;

use super::lock::Lock;

/// Condition variable bound to a [`Lock`].
///
/// Sleepers wait on a non-donating queue: nobody owns a condition, so there
/// is no one to donate to.
pub struct Condition {
    lock: Arc<Lock>,
    queue: QueueId,
}

impl Condition {
    pub fn new(lock: Arc<Lock>) -> Self {
        let queue = lock.scheduler.section().new_thread_queue(false);
        Self { lock, queue }
    }

    pub fn lock(&self) -> &Arc<Lock> {
        &self.lock
    }

    pub fn queue_id(&self) -> QueueId {
        self.queue
    }

    fn is_waiting(&self, thread: ThreadId) -> bool {
        self.lock.scheduler.section().waiting_on(thread) == Some(self.queue)
    }

    /// Release the lock, sleep until woken, then re-acquire the lock.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread does not hold the lock.
    pub fn sleep(&self) {
        let me = self.lock.runtime.current_thread();
        {
            let mut section = self.lock.scheduler.section();
            assert_eq!(
                section.owner(self.lock.queue),
                Some(me),
                "{me} slept on a condition without holding its lock"
            );
            section.queue(self.queue).wait_for_access(me);
        }
        trace!(thread = %me, queue = %self.queue, "sleeping on condition");
        self.lock.release();
        while self.is_waiting(me) {
            self.lock.runtime.sleep();
        }
        self.lock.acquire();
    }

    /// Wake the highest-priority sleeper. Returns `false` if none was asleep.
    pub fn wake(&self) -> bool {
        let next = self.lock.scheduler.section().queue(self.queue).next_thread();
        match next {
            Some(thread) => {
                self.lock.runtime.ready(thread);
                true
            }
            None => false,
        }
    }

    /// Wake every sleeper and return how many there were.
    pub fn wake_all(&self) -> usize {
        let woken: Vec<ThreadId> = {
            let mut section = self.lock.scheduler.section();
            let mut queue = section.queue(self.queue);
            std::iter::from_fn(|| queue.next_thread()).collect()
        };
        for &thread in &woken {
            self.lock.runtime.ready(thread);
        }
        woken.len()
    }
}

impl Drop for Condition {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        let mut section = self.lock.scheduler.section();
        if section.is_empty(self.queue) {
            section.discard_queue(self.queue);
        } else {
            warn!(
                queue = %self.queue,
                waiters = ?section.waiters(self.queue),
                "condition dropped with waiters; queue left in place"
            );
        }
    }
}
