use std::path::Path;

use serde::{Deserialize, Serialize};

use donor_core::config::{env_flag, env_parse};
use donor_core::Priority;

use crate::error::SchedError;

/// Scheduler configuration, typically parsed from the `[scheduler]` table of
/// a TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Base priority given to a thread the first time the scheduler sees it.
    #[serde(default = "default_priority")]
    pub default_priority: Priority,
    /// Record operation counters in [`SchedulerMetrics`](crate::SchedulerMetrics).
    #[serde(default = "default_track_metrics")]
    pub track_metrics: bool,
}

fn default_priority() -> Priority {
    Priority::DEFAULT
}

fn default_track_metrics() -> bool {
    true
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_priority: default_priority(),
            track_metrics: default_track_metrics(),
        }
    }
}

impl SchedulerConfig {
    /// Parse config from a TOML string, then apply environment overrides.
    pub fn from_toml(toml_str: &str) -> Result<Self, SchedError> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchedError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Override fields from `DONOR_DEFAULT_PRIORITY` and `DONOR_TRACK_METRICS`.
    pub fn apply_env_overrides(&mut self) -> Result<(), SchedError> {
        if let Some(raw) = env_parse::<i64>("DONOR_DEFAULT_PRIORITY")? {
            self.default_priority = Priority::try_from(raw)?;
        }
        if let Some(track) = env_flag("DONOR_TRACK_METRICS") {
            self.track_metrics = track;
        }
        Ok(())
    }
}
