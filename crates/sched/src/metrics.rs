use serde::Serialize;

/// Scheduler operation counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerMetrics {
    /// Queues allocated by `new_thread_queue`.
    pub queues_created: u64,
    /// Queues released by `discard_queue`.
    pub queues_discarded: u64,
    /// Successful `wait_for_access` calls.
    pub enqueues: u64,
    /// Threads returned by `next_thread`.
    pub selections: u64,
    /// `next_thread` calls that moved ownership of a queue.
    pub handoffs: u64,
    /// Base priority changes (no-op sets excluded).
    pub priority_changes: u64,
    /// Propagation passes started.
    pub propagation_runs: u64,
    /// Threads visited across all propagation passes.
    pub propagation_steps: u64,
    /// Most threads whose effective priority changed in a single pass.
    pub longest_propagation: usize,
}

impl SchedulerMetrics {
    /// Record one propagation pass.
    pub fn record_propagation(&mut self, visited: usize, changed: usize) {
        self.propagation_runs += 1;
        self.propagation_steps += visited as u64;
        self.longest_propagation = self.longest_propagation.max(changed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics() {
        let m = SchedulerMetrics::default();
        assert_eq!(m.enqueues, 0);
        assert_eq!(m.propagation_runs, 0);
        assert_eq!(m.longest_propagation, 0);
    }

    #[test]
    fn record_propagation_tracks_longest_pass() {
        let mut m = SchedulerMetrics::default();
        m.record_propagation(4, 3);
        m.record_propagation(1, 0);
        assert_eq!(m.propagation_runs, 2);
        assert_eq!(m.propagation_steps, 5);
        assert_eq!(m.longest_propagation, 3);
    }
}
