//! App - the scheduling/execution logic wired over the ports.
//!
//! # Components
//! - **schedule**: pure next-deadline math (daily/weekly)
//! - **RetentionExecutor**: one cleanup pass with a bounded deletion pool
//! - **JobCoordinator**: lifecycle of the single recurring job
//! - **CoordinatorStatus**: observability view

pub mod coordinator;
pub mod executor;
pub mod schedule;
pub mod status;

pub use coordinator::JobCoordinator;
pub use executor::{ExecutorConfig, RetentionExecutor};
pub use status::CoordinatorStatus;
