//! Task traits and error types.
//!
//! The [`Task`] trait is the unit of work run by the
//! [`TaskExecutor`](crate::TaskExecutor). A [`DependentTask`] additionally
//! declares child tasks that are run on the same pool between its
//! "before" and "after" phases.

use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::debug;

use super::context::{ContextError, ExecutionContext};

/// Errors that can occur during task execution.
///
/// A `TaskError` returned from a task body is never propagated out of the
/// pool. It is captured on the task's [`TaskStatus`](crate::TaskStatus) and
/// must be inspected there.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The task body failed with a message.
    #[error("{0}")]
    Failed(String),

    /// A dependent task declared dependencies but its context has no executor.
    #[error("there is no task executor in the execution context for dependent task processing")]
    MissingExecutor,

    /// Error accessing the execution context.
    #[error("context error: {0}")]
    Context(#[from] ContextError),

    /// The task body panicked.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The pool was saturated and its policy rejects new work.
    #[error("task '{0}' rejected: executor is saturated")]
    Rejected(String),

    /// The executor was shut down before the task could start.
    #[error("task '{0}' rejected: executor is shut down")]
    ShutDown(String),

    /// Generic error wrapper.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl TaskError {
    /// Create a [`TaskError::Failed`] from any message.
    pub fn failed(message: impl Into<String>) -> Self {
        TaskError::Failed(message.into())
    }

    /// Convert a panic payload caught by `catch_unwind` into an error.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        TaskError::Panicked(message)
    }
}

/// The core trait for defining executable tasks.
///
/// # Example
///
/// ```
/// use taskweave::{ExecutionContext, Task, TaskError};
///
/// struct Greet;
///
/// impl Task for Greet {
///     fn name(&self) -> &str {
///         "greet"
///     }
///
///     fn execute(&self, ctx: &ExecutionContext) -> Result<(), TaskError> {
///         ctx.set_object("greeting", Some("hello".to_string()));
///         Ok(())
///     }
/// }
/// ```
pub trait Task: Send + Sync {
    /// Returns the name of this task.
    fn name(&self) -> &str;

    /// Execute the task against the shared context.
    fn execute(&self, ctx: &ExecutionContext) -> Result<(), TaskError>;

    /// Optional description for display/logging purposes.
    fn description(&self) -> Option<&str> {
        None
    }
}

/// Ordered, thread-safe list of dependency tasks owned by a [`DependentTask`].
///
/// The list can be filled ahead of time or lazily from
/// [`DependentTask::before_dependencies`], which only has `&self`.
#[derive(Default)]
pub struct Dependencies {
    tasks: Mutex<Vec<Arc<dyn Task>>>,
}

impl Dependencies {
    /// Create an empty dependency list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a dependency.
    pub fn push(&self, task: Arc<dyn Task>) {
        self.lock().push(task);
    }

    /// Append several dependencies, keeping their order.
    pub fn extend<I>(&self, tasks: I)
    where
        I: IntoIterator<Item = Arc<dyn Task>>,
    {
        self.lock().extend(tasks);
    }

    /// Copy of the current list.
    pub fn snapshot(&self) -> Vec<Arc<dyn Task>> {
        self.lock().clone()
    }

    /// Number of declared dependencies.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no dependencies are declared.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove every declared dependency.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Arc<dyn Task>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.lock().iter().map(|t| t.name().to_string()).collect();
        f.debug_list().entries(names).finish()
    }
}

/// A task whose body is split around the completion of its dependencies.
///
/// Every `DependentTask` is a [`Task`]. Its `execute` runs
/// [`before_dependencies`](Self::before_dependencies), then launches every
/// declared dependency onto the context's executor in a fresh group and
/// waits for all of them, then runs [`after_dependencies`](Self::after_dependencies).
///
/// Dependencies may themselves be dependent tasks, so a single task can fan
/// out into an arbitrarily deep tree. A parent only waits for its own
/// children. Child failures are recorded on the children's statuses and do
/// not fail the parent.
pub trait DependentTask: Send + Sync {
    /// Returns the name of this task.
    fn name(&self) -> &str;

    /// The dependency list owned by this task.
    fn dependencies(&self) -> &Dependencies;

    /// Runs before any dependency is launched. Typically computes and
    /// registers the dependencies.
    fn before_dependencies(&self, ctx: &ExecutionContext) -> Result<(), TaskError>;

    /// Runs after every dependency has reached a terminal state.
    fn after_dependencies(&self, _ctx: &ExecutionContext) -> Result<(), TaskError> {
        Ok(())
    }
}

impl<T: DependentTask> Task for T {
    fn name(&self) -> &str {
        DependentTask::name(self)
    }

    fn execute(&self, ctx: &ExecutionContext) -> Result<(), TaskError> {
        run_dependent(self, ctx)
    }
}

/// Run the before/dependencies/after protocol of a [`DependentTask`].
pub fn run_dependent<T>(task: &T, ctx: &ExecutionContext) -> Result<(), TaskError>
where
    T: DependentTask + ?Sized,
{
    task.before_dependencies(ctx)?;

    let dependencies = task.dependencies().snapshot();
    if !dependencies.is_empty() {
        let executor = ctx.executor().ok_or(TaskError::MissingExecutor)?;
        debug!(
            task = DependentTask::name(task),
            count = dependencies.len(),
            "launching dependencies"
        );
        let group = executor.create_tasks_group();
        for dependency in dependencies {
            executor.launch_in(dependency, ctx, &group);
        }
        group.wait_all_tasks_complete();
    }

    task.after_dependencies(ctx)
}
