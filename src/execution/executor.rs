//! Task execution engine.
//!
//! The `TaskExecutor` owns one bounded [`ThreadPool`] and runs tasks on it.
//! Dependent tasks re-enter the same executor through their
//! [`ExecutionContext`] to launch their dependencies, so the whole task tree
//! shares a single pool.
//!
//! Failures raised by task bodies (returned errors and panics) never leave
//! the pool. They are stored on the task's [`TaskStatus`] and nothing else
//! reports them.
//!
//! The pool is a shared, re-entrant resource: a parent task occupies a worker
//! while it waits for its children. With [`SaturationPolicy::CallerRuns`]
//! children that find no free worker run on the parent's own thread. With
//! [`SaturationPolicy::Reject`] they fail instead, so deep trees on small
//! pools lose work rather than progress.
//!
//! Workers stay alive for as long as any handle to the executor exists, and
//! every [`ExecutionContext`] from [`TaskExecutor::context`] holds one. Call
//! [`TaskExecutor::shutdown`] to stop them regardless of outstanding handles.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, ExecutorConfig};
use crate::core::context::ExecutionContext;
use crate::core::task::{Task, TaskError};

use super::group::TaskStatusGroup;
use super::pool::{Job, SaturationPolicy, Submission, ThreadPool};
use super::status::TaskStatus;

/// Errors returned synchronously by the executor.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// An argument was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The executor configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Executor running tasks on a bounded thread pool.
///
/// `TaskExecutor` is `Clone`; clones share the same pool. Worker threads
/// exit once the last handle is dropped and they are idle.
#[derive(Clone)]
pub struct TaskExecutor {
    inner: Arc<ExecutorInner>,
}

struct ExecutorInner {
    pool: ThreadPool,
    config: ExecutorConfig,
}

impl TaskExecutor {
    /// Create an executor with the given pool sizing.
    ///
    /// This constructor never fails: a `max_threads` below `min_threads` (or
    /// zero) is raised to `max(min_threads, 1)` and a warning is logged. Use
    /// [`from_config`](Self::from_config) to reject such sizing instead.
    /// Workers above `min_threads` exit after `keep_alive_secs` idle.
    pub fn new(min_threads: usize, max_threads: usize, keep_alive_secs: u64) -> Self {
        let clamped = max_threads.max(min_threads).max(1);
        if clamped != max_threads {
            warn!(
                min_threads,
                requested = max_threads,
                max_threads = clamped,
                "max_threads raised to fit min_threads"
            );
        }
        Self::build(ExecutorConfig::new(min_threads, clamped, keep_alive_secs))
    }

    /// Create an executor from a validated configuration.
    pub fn from_config(config: &ExecutorConfig) -> Result<Self, ExecutorError> {
        config.validate()?;
        Ok(Self::build(config.clone()))
    }

    fn build(config: ExecutorConfig) -> Self {
        let pool = ThreadPool::new(
            config.min_threads,
            config.max_threads,
            config.keep_alive(),
            config.saturation,
            config.thread_name.clone(),
        );
        debug!(
            min_threads = config.min_threads,
            max_threads = config.max_threads,
            keep_alive_secs = config.keep_alive_secs,
            saturation = ?config.saturation,
            "task executor created"
        );
        Self {
            inner: Arc::new(ExecutorInner { pool, config }),
        }
    }

    /// The configuration this executor was built with.
    pub fn config(&self) -> &ExecutorConfig {
        &self.inner.config
    }

    /// The saturation policy of the pool.
    pub fn saturation_policy(&self) -> SaturationPolicy {
        self.inner.pool.policy()
    }

    /// Current number of worker threads.
    pub fn pool_size(&self) -> usize {
        self.inner.pool.pool_size()
    }

    /// Largest number of worker threads that ever existed at once.
    pub fn largest_pool_size(&self) -> usize {
        self.inner.pool.largest_pool_size()
    }

    /// Number of workers currently running a task.
    pub fn active_count(&self) -> usize {
        self.inner.pool.active_count()
    }

    /// Stop accepting tasks and let the workers exit.
    ///
    /// Tasks already running finish normally. Tasks launched afterwards are
    /// not run; their statuses complete at once with [`TaskError::ShutDown`].
    /// [`execute`](Self::execute) still runs on the calling thread.
    pub fn shutdown(&self) {
        info!(workers = self.pool_size(), "shutting down task executor");
        self.inner.pool.shutdown();
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.inner.pool.is_shutdown()
    }

    /// Block until every worker has exited after a shutdown, or `timeout`
    /// elapses. Returns `true` once no workers are left.
    ///
    /// Must not be called from inside a task running on this executor.
    pub fn await_termination(&self, timeout: Duration) -> bool {
        self.inner.pool.await_termination(timeout)
    }

    /// Create a fresh context bound to this executor.
    pub fn context(&self) -> ExecutionContext {
        ExecutionContext::new(self.clone())
    }

    /// Create an empty task group.
    pub fn create_tasks_group(&self) -> TaskStatusGroup {
        TaskStatusGroup::new()
    }

    /// Run `task` synchronously on the calling thread.
    ///
    /// The returned status is already terminal; if the body failed the error
    /// is its unhandled failure. No error propagates out of this call, and
    /// that includes [`TaskError::MissingExecutor`] from a dependent task run
    /// on a detached context: inspect
    /// [`unhandled_failure`](TaskStatus::unhandled_failure) for it exactly as
    /// for a launched task.
    pub fn execute(&self, task: Arc<dyn Task>, ctx: &ExecutionContext) -> TaskStatus {
        let status = TaskStatus::new(task);
        let (outcome, duration) = run_task(status.task().as_ref(), ctx);
        status.complete(outcome, duration);
        status
    }

    /// Submit `task` to the pool and return its status.
    ///
    /// Usually returns at once with a running status. If the pool is
    /// saturated and uses [`SaturationPolicy::CallerRuns`], the task runs on
    /// the calling thread before this returns.
    pub fn launch(&self, task: Arc<dyn Task>, ctx: &ExecutionContext) -> TaskStatus {
        self.do_launch(task, ctx, None)
    }

    /// Like [`launch`](Self::launch), also tracking the task in `group`.
    ///
    /// The status joins the group before the task can start, so a wait on
    /// the group always covers it.
    pub fn launch_in(
        &self,
        task: Arc<dyn Task>,
        ctx: &ExecutionContext,
        group: &TaskStatusGroup,
    ) -> TaskStatus {
        self.do_launch(task, ctx, Some(group))
    }

    /// Launch every task into one fresh group and wait for all of them.
    ///
    /// Statuses are returned in submission order, all terminal.
    pub fn execute_all(
        &self,
        tasks: &[Arc<dyn Task>],
        ctx: &ExecutionContext,
    ) -> Result<Vec<TaskStatus>, ExecutorError> {
        if tasks.is_empty() {
            return Err(ExecutorError::InvalidArgument(
                "tasks list should not be empty".to_string(),
            ));
        }

        let group = self.create_tasks_group();
        let statuses: Vec<TaskStatus> = tasks
            .iter()
            .map(|task| self.do_launch(Arc::clone(task), ctx, Some(&group)))
            .collect();
        group.wait_all_tasks_complete();
        Ok(statuses)
    }

    fn do_launch(
        &self,
        task: Arc<dyn Task>,
        ctx: &ExecutionContext,
        group: Option<&TaskStatusGroup>,
    ) -> TaskStatus {
        let status = TaskStatus::new(task);
        if let Some(group) = group {
            group.add(status.clone());
        }
        debug!(task = status.name(), launch = %status.id(), "launching task");

        let job_status = status.clone();
        let job_ctx = ctx.clone();
        let job_group = group.cloned();
        let job: Job = Box::new(move || {
            let (outcome, duration) = run_task(job_status.task().as_ref(), &job_ctx);
            finish(&job_status, job_group.as_ref(), outcome, duration);
        });

        if let Submission::Rejected(job) = self.inner.pool.execute(job) {
            drop(job);
            let name = status.name().to_string();
            let err = if self.is_shut_down() {
                warn!(task = %name, "task rejected by shut down executor");
                TaskError::ShutDown(name)
            } else {
                warn!(task = %name, "task rejected by saturated pool");
                TaskError::Rejected(name)
            };
            finish(&status, group, Err(err), Duration::ZERO);
        }
        status
    }
}

impl std::fmt::Debug for TaskExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskExecutor")
            .field("pool", &self.inner.pool)
            .finish()
    }
}

/// Run a task body, converting panics into errors.
fn run_task(task: &dyn Task, ctx: &ExecutionContext) -> (Result<(), TaskError>, Duration) {
    let start = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| task.execute(ctx)))
        .unwrap_or_else(|payload| Err(TaskError::from_panic(payload)));
    if let Err(e) = &outcome {
        warn!(task = task.name(), error = %e, "task failed");
    }
    (outcome, start.elapsed())
}

/// Complete the status, then leave the group. The order matters: a waiter
/// woken by the removal must observe the terminal status.
fn finish(
    status: &TaskStatus,
    group: Option<&TaskStatusGroup>,
    outcome: Result<(), TaskError>,
    duration: Duration,
) {
    status.complete(outcome, duration);
    if let Some(group) = group {
        group.remove(status);
    }
}
