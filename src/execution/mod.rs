//! Task execution engine.
//!
//! This module provides the thread pool, the executor built on it, and the
//! status and group handles used to observe launched tasks.

mod executor;
mod group;
mod pool;
mod status;

pub use executor::{ExecutorError, TaskExecutor};
pub use group::TaskStatusGroup;
pub use pool::{Job, SaturationPolicy, Submission, ThreadPool};
pub use status::TaskStatus;
