pub mod config;
pub mod error;
pub mod priority;
pub mod thread;

pub use error::*;
pub use priority::{Priority, PRIORITY_LEVELS};
pub use thread::ThreadId;
