//! Scripted scheduler runs loaded from TOML.
//!
//! A [`Scenario`] names its threads and queues, then lists steps that drive a
//! single scheduler. Steps that would break a scheduler contract are rejected
//! as [`SchedError::Contract`] before they reach the scheduler.

mod runner;
mod types;

use std::collections::HashSet;
use std::path::Path;

use crate::error::SchedError;

pub use types::{QueueSpec, Scenario, ScenarioReport, Step, StepRecord, ThreadSnapshot, ThreadSpec};

impl Scenario {
    /// Parse a scenario from TOML, applying environment overrides to its
    /// `[scheduler]` table.
    pub fn from_toml(toml_str: &str) -> Result<Self, SchedError> {
        let mut scenario: Self = toml::from_str(toml_str)?;
        scenario.scheduler.apply_env_overrides()?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchedError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Check that names are unique and every step refers to a declared
    /// thread and queue.
    pub fn validate(&self) -> Result<(), SchedError> {
        let threads = unique_names("thread", self.threads.iter().map(|t| t.name.as_str()))?;
        let queues = unique_names("queue", self.queues.iter().map(|q| q.name.as_str()))?;

        for (i, step) in self.steps.iter().enumerate() {
            if let Some(name) = step.thread_name() {
                if !threads.contains(name) {
                    return Err(SchedError::UnknownName {
                        step: i + 1,
                        kind: "thread",
                        name: name.to_string(),
                    });
                }
            }
            if let Some(name) = step.queue_name() {
                if !queues.contains(name) {
                    return Err(SchedError::UnknownName {
                        step: i + 1,
                        kind: "queue",
                        name: name.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn unique_names<'a>(
    kind: &'static str,
    names: impl Iterator<Item = &'a str>,
) -> Result<HashSet<&'a str>, SchedError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(SchedError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(seen)
}
