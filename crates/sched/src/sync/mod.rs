//! Synchronization primitives built on the public queue interface.
//!
//! These are ordinary scheduler clients: they enter a [`Section`](crate::Section),
//! use [`ThreadQueue`](crate::ThreadQueue) operations, and leave the section
//! before asking the [`ThreadRuntime`] to suspend or resume a thread.

mod condition;
mod lock;
mod runtime;

pub use condition::Condition;
pub use lock::{Lock, LockGuard};
pub use runtime::{ParkingRuntime, ThreadRuntime};
