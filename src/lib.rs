//! taskweave - a thread-pool task executor with recursive dependent tasks.
//!
//! A [`TaskExecutor`] owns one bounded thread pool. Tasks are launched onto
//! it individually or in batches, and their progress is observed through
//! [`TaskStatus`] handles and [`TaskStatusGroup`] wait groups. A
//! [`DependentTask`] launches its own dependencies onto the same pool and
//! waits for them between its "before" and "after" phases, which lets a
//! single task fan out into a whole tree of pool-scheduled work.
//!
//! ```
//! use std::sync::Arc;
//! use taskweave::{ExecutionContext, Task, TaskError, TaskExecutor};
//!
//! struct Store(&'static str);
//!
//! impl Task for Store {
//!     fn name(&self) -> &str {
//!         self.0
//!     }
//!
//!     fn execute(&self, ctx: &ExecutionContext) -> Result<(), TaskError> {
//!         ctx.set_object(self.0, Some(self.0.len()));
//!         Ok(())
//!     }
//! }
//!
//! let executor = TaskExecutor::new(2, 4, 60);
//! let ctx = executor.context();
//! let group = executor.create_tasks_group();
//! for name in ["alpha", "beta", "gamma"] {
//!     executor.launch_in(Arc::new(Store(name)), &ctx, &group);
//! }
//! group.wait_all_tasks_complete();
//!
//! assert_eq!(*ctx.get_object::<usize>("gamma").unwrap(), 5);
//! ```

pub mod config;
pub mod core;
pub mod execution;
pub mod testing;
pub mod workloads;

pub use config::{ConfigError, ConfigLoader, ExecutorConfig};
pub use core::context::{ContextError, ExecutionContext};
pub use core::task::{run_dependent, Dependencies, DependentTask, Task, TaskError};
pub use core::types::LaunchId;
pub use execution::{
    ExecutorError, Job, SaturationPolicy, Submission, TaskExecutor, TaskStatus, TaskStatusGroup,
    ThreadPool,
};
