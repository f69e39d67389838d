//! Priority-inheritance scheduler.
//!
//! Split into focused submodules:
//! - `core`: Scheduler struct, shared state, thread lookup, and the priority API
//! - `queueing`: queue lifecycle plus enqueue, acquire, and selection
//! - `donation`: effective-priority computation and iterative propagation
//! - `section`: the exclusive-section guard every caller goes through

mod core;
mod donation;
mod queueing;
mod section;

pub use self::core::Scheduler;
pub(crate) use self::core::SchedState;
pub use self::section::Section;
