use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use donor_core::{Priority, ThreadId};

use crate::arena::{Arena, QueueId};
use crate::config::SchedulerConfig;
use crate::metrics::SchedulerMetrics;
use crate::queue::WaitQueue;
use crate::state::ThreadState;

use super::section::Section;

/// The priority scheduler. All scheduling state sits behind one lock, and
/// the only way to reach it is a [`Section`].
pub struct Scheduler {
    inner: Mutex<SchedState>,
}

impl Scheduler {
    /// Create a scheduler with default configuration.
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        debug!(
            default_priority = %config.default_priority,
            track_metrics = config.track_metrics,
            "scheduler created"
        );
        Self {
            inner: Mutex::new(SchedState::new(config)),
        }
    }

    /// Enter the exclusive scheduling section.
    ///
    /// Blocks until no other section is live. Release it (drop the guard)
    /// before suspending the calling thread.
    pub fn section(&self) -> Section<'_> {
        let guard = self
            .inner
            .lock()
            .expect("scheduler state poisoned by an earlier contract violation");
        Section::new(guard)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Scheduling state shared by every section.
#[derive(Debug)]
pub(crate) struct SchedState {
    pub(crate) config: SchedulerConfig,
    pub(crate) threads: HashMap<ThreadId, ThreadState>,
    pub(crate) queues: Arena<WaitQueue>,
    /// Next arrival stamp. Global, so stamps order every enqueue ever made.
    pub(crate) next_seq: u64,
    pub(crate) metrics: SchedulerMetrics,
}

impl SchedState {
    pub(crate) fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            threads: HashMap::new(),
            queues: Arena::new(),
            next_seq: 0,
            metrics: SchedulerMetrics::default(),
        }
    }

    pub(crate) fn queue(&self, id: QueueId) -> &WaitQueue {
        self.queues
            .get(id)
            .unwrap_or_else(|| panic!("queue {id} used after it was discarded"))
    }

    pub(crate) fn queue_mut(&mut self, id: QueueId) -> &mut WaitQueue {
        self.queues
            .get_mut(id)
            .unwrap_or_else(|| panic!("queue {id} used after it was discarded"))
    }

    /// Scheduling record for `thread`, attached on first use.
    pub(crate) fn thread_mut(&mut self, thread: ThreadId) -> &mut ThreadState {
        let default = self.config.default_priority;
        self.threads
            .entry(thread)
            .or_insert_with(|| ThreadState::new(default))
    }

    pub(crate) fn record(&mut self, f: impl FnOnce(&mut SchedulerMetrics)) {
        if self.config.track_metrics {
            f(&mut self.metrics);
        }
    }

    pub(crate) fn priority(&self, thread: ThreadId) -> Priority {
        self.threads
            .get(&thread)
            .map_or(self.config.default_priority, |s| s.base)
    }

    pub(crate) fn effective_priority(&self, thread: ThreadId) -> Priority {
        let Some(state) = self.threads.get(&thread) else {
            return self.config.default_priority;
        };
        debug_assert_eq!(
            state.effective,
            self.compute_effective(thread),
            "stale effective priority for {thread}"
        );
        state.effective
    }

    pub(crate) fn set_priority(&mut self, thread: ThreadId, priority: Priority) {
        let state = self.thread_mut(thread);
        if state.base == priority {
            return;
        }
        let old = std::mem::replace(&mut state.base, priority);
        debug!(thread = %thread, from = %old, to = %priority, "base priority changed");
        self.record(|m| m.priority_changes += 1);
        self.propagate(thread);
    }

    pub(crate) fn increase_priority(&mut self, thread: ThreadId) -> bool {
        match self.priority(thread).raised() {
            Some(p) => {
                self.set_priority(thread, p);
                true
            }
            None => false,
        }
    }

    pub(crate) fn decrease_priority(&mut self, thread: ThreadId) -> bool {
        match self.priority(thread).lowered() {
            Some(p) => {
                self.set_priority(thread, p);
                true
            }
            None => false,
        }
    }

    /// Drop the record of a finished thread. Queues it owned become ownerless.
    ///
    /// A thread must not finish while owning a queue that has waiters: with
    /// no owner left, `next_thread` could never hand that queue on.
    pub(crate) fn thread_finished(&mut self, thread: ThreadId) {
        let Some(state) = self.threads.get(&thread) else {
            return;
        };
        assert!(
            state.waiting_on.is_none(),
            "{thread} finished while waiting on {:?}",
            state.waiting_on
        );
        for (id, queue) in self.queues.iter() {
            assert!(
                queue.owner() != Some(thread) || queue.is_empty(),
                "{thread} finished while owning {id} with {} waiter(s)",
                queue.len()
            );
        }
        for (id, queue) in self.queues.iter_mut() {
            if queue.owner() == Some(thread) {
                queue.set_owner(None);
                debug!(thread = %thread, queue = %id, "owner finished, queue released");
            }
        }
        self.threads.remove(&thread);
    }
}
