//! Thread priority levels.
//!
//! Priorities form a small fixed range `[0, 7]`. Higher values are scheduled
//! first. Every thread starts at [`Priority::DEFAULT`].

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Number of distinct priority levels (`0..=7`).
pub const PRIORITY_LEVELS: usize = 8;

/// A validated scheduling priority. Higher value = scheduled earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    /// Lowest priority.
    pub const MIN: Priority = Priority(0);
    /// Highest priority.
    pub const MAX: Priority = Priority(7);
    /// Priority of a thread the scheduler has never been told about.
    pub const DEFAULT: Priority = Priority(1);

    /// Validate a raw priority value.
    pub fn new(value: u8) -> Result<Self, CoreError> {
        if value <= Self::MAX.0 {
            Ok(Self(value))
        } else {
            Err(CoreError::PriorityOutOfRange(i64::from(value)))
        }
    }

    /// Build a priority from a value the caller guarantees is in range.
    ///
    /// # Panics
    ///
    /// Panics if `value > 7`.
    pub fn from_raw(value: u8) -> Self {
        assert!(
            value <= Self::MAX.0,
            "priority {value} out of range [{}, {}]",
            Self::MIN.0,
            Self::MAX.0
        );
        Self(value)
    }

    pub const fn value(self) -> u8 {
        self.0
    }

    /// Bucket index for this priority.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// One level higher, or `None` at [`Priority::MAX`].
    pub fn raised(self) -> Option<Self> {
        (self < Self::MAX).then(|| Self(self.0 + 1))
    }

    /// One level lower, or `None` at [`Priority::MIN`].
    pub fn lowered(self) -> Option<Self> {
        (self > Self::MIN).then(|| Self(self.0 - 1))
    }

    /// All priorities from highest to lowest.
    pub fn descending() -> impl Iterator<Item = Priority> {
        (Self::MIN.0..=Self::MAX.0).rev().map(Self)
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u8> for Priority {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<i64> for Priority {
    type Error = CoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(|v| Self::new(v).ok())
            .ok_or(CoreError::PriorityOutOfRange(value))
    }
}

impl From<Priority> for u8 {
    fn from(p: Priority) -> Self {
        p.0
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
