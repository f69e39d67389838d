//! Priority-inheritance thread scheduler.
//!
//! Threads wait on [`ThreadQueue`]s ordered by effective priority (FIFO within
//! a level). Queues created with `transfer_priority` donate the priority of
//! their highest waiter to their owner, transitively along ownership chains.
//!
//! Every operation runs inside a [`Section`], the scheduler's exclusive
//! section, obtained from [`Scheduler::section`].

pub mod arena;
pub mod config;
pub mod error;
pub mod metrics;
pub mod queue;
pub mod scenario;
pub mod scheduler;
pub mod state;
pub mod sync;

pub use arena::QueueId;
pub use config::SchedulerConfig;
pub use error::SchedError;
pub use metrics::SchedulerMetrics;
pub use queue::{QueueMut, ThreadQueue};
pub use scenario::{Scenario, ScenarioReport};
pub use scheduler::{Scheduler, Section};
pub use sync::{Condition, Lock, LockGuard, ParkingRuntime, ThreadRuntime};

pub use donor_core::{Priority, ThreadId, PRIORITY_LEVELS};
