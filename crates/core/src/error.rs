use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("priority {0} out of range [0, 7]")]
    PriorityOutOfRange(i64),

    #[error("invalid environment value for {key}: {value}")]
    InvalidEnv { key: String, value: String },
}
