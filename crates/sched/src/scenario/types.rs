use std::fmt;

use serde::{Deserialize, Serialize};

use donor_core::Priority;

use crate::config::SchedulerConfig;
use crate::metrics::SchedulerMetrics;

/// A scripted run against a fresh scheduler.
///
/// ```toml
/// name = "inversion"
///
/// [scheduler]
/// default_priority = 1
///
/// [[threads]]
/// name = "low"
///
/// [[threads]]
/// name = "high"
/// priority = 6
///
/// [[queues]]
/// name = "lock"
///
/// [[steps]]
/// op = "acquire"
/// thread = "low"
/// queue = "lock"
///
/// [[steps]]
/// op = "wait"
/// thread = "high"
/// queue = "lock"
///
/// [[steps]]
/// op = "expect_effective"
/// thread = "low"
/// priority = 6
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub threads: Vec<ThreadSpec>,
    #[serde(default)]
    pub queues: Vec<QueueSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadSpec {
    pub name: String,
    /// Initial base priority; the scheduler default when absent.
    #[serde(default)]
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSpec {
    pub name: String,
    /// Whether waiters donate priority to the owner.
    #[serde(default = "default_transfer")]
    pub transfer: bool,
}

fn default_transfer() -> bool {
    true
}

/// One scenario step, tagged by `op`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Wait {
        thread: String,
        queue: String,
    },
    Acquire {
        thread: String,
        queue: String,
    },
    /// Select the next waiter; the selection is recorded but not checked.
    Next {
        queue: String,
    },
    SetPriority {
        thread: String,
        priority: Priority,
    },
    Increase {
        thread: String,
    },
    Decrease {
        thread: String,
    },
    ExpectEffective {
        thread: String,
        priority: Priority,
    },
    /// Select the next waiter and require it to be `thread` (or nobody).
    ExpectNext {
        queue: String,
        #[serde(default)]
        thread: Option<String>,
    },
}

impl Step {
    /// Thread names the step refers to.
    pub(crate) fn thread_name(&self) -> Option<&str> {
        match self {
            Step::Wait { thread, .. }
            | Step::Acquire { thread, .. }
            | Step::SetPriority { thread, .. }
            | Step::Increase { thread }
            | Step::Decrease { thread }
            | Step::ExpectEffective { thread, .. } => Some(thread),
            Step::ExpectNext { thread, .. } => thread.as_deref(),
            Step::Next { .. } => None,
        }
    }

    pub(crate) fn queue_name(&self) -> Option<&str> {
        match self {
            Step::Wait { queue, .. }
            | Step::Acquire { queue, .. }
            | Step::Next { queue }
            | Step::ExpectNext { queue, .. } => Some(queue),
            _ => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Wait { thread, queue } => write!(f, "{thread} waits on {queue}"),
            Step::Acquire { thread, queue } => write!(f, "{thread} acquires {queue}"),
            Step::Next { queue } => write!(f, "next on {queue}"),
            Step::SetPriority { thread, priority } => write!(f, "{thread} set to {priority}"),
            Step::Increase { thread } => write!(f, "{thread} increased"),
            Step::Decrease { thread } => write!(f, "{thread} decreased"),
            Step::ExpectEffective { thread, priority } => {
                write!(f, "expect {thread} effective {priority}")
            }
            Step::ExpectNext { queue, thread } => match thread {
                Some(t) => write!(f, "expect next on {queue} is {t}"),
                None => write!(f, "expect {queue} empty"),
            },
        }
    }
}

/// Base and effective priority of one thread at a point in the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadSnapshot {
    pub name: String,
    pub base: Priority,
    pub effective: Priority,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    /// 1-based position in the scenario.
    pub index: usize,
    pub description: String,
    /// Thread selected by `next`/`expect_next`, when any was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<String>,
    /// `false` when an `increase`/`decrease` hit the end of the range.
    pub applied: bool,
    pub threads: Vec<ThreadSnapshot>,
}

/// Outcome of [`Scenario::run`].
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub steps: Vec<StepRecord>,
    pub threads: Vec<ThreadSnapshot>,
    pub metrics: SchedulerMetrics,
}

impl ScenarioReport {
    /// Final snapshot of a thread by name.
    pub fn thread(&self, name: &str) -> Option<&ThreadSnapshot> {
        self.threads.iter().find(|t| t.name == name)
    }
}
