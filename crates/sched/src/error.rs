//! Scheduler crate error types.
//!
//! Contract violations inside the scheduler are panics. These errors cover
//! the recoverable edges: configuration and scenario files.

use thiserror::Error;

use donor_core::CoreError;

#[derive(Debug, Error)]
pub enum SchedError {
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config I/O error: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("duplicate {kind} name: {name}")]
    DuplicateName { kind: &'static str, name: String },

    #[error("step {step}: unknown {kind} {name:?}")]
    UnknownName {
        step: usize,
        kind: &'static str,
        name: String,
    },

    #[error("step {step}: {message}")]
    Contract { step: usize, message: String },

    #[error("step {step}: expectation failed: {message}")]
    ExpectationFailed { step: usize, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_pass_through_unchanged() {
        let err = SchedError::from(CoreError::PriorityOutOfRange(9));
        assert_eq!(err.to_string(), "priority 9 out of range [0, 7]");
    }

    #[test]
    fn step_errors_name_the_step() {
        let err = SchedError::UnknownName {
            step: 3,
            kind: "queue",
            name: "q".into(),
        };
        assert_eq!(err.to_string(), "step 3: unknown queue \"q\"");
    }
}
