//! Testing utilities for users of the taskweave library.
//!
//! This module provides small tasks with observable behavior:
//!
//! - [`SleepTask`]: sleeps a random time, then records its name in the context
//! - [`FailingTask`]: fails a configurable number of times, then succeeds
//! - [`RecordingTask`]: records which thread ran it and how often
//! - [`FanOutTask`]: a dependent task with a fixed set of leaf dependencies
//!
//! plus [`collect_failures`] for aggregating failures across statuses.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Duration;

use crate::core::context::ExecutionContext;
use crate::core::task::{Dependencies, DependentTask, Task, TaskError};
use crate::execution::TaskStatus;
use crate::workloads::random_in_range;

/// A task that sleeps a random time below `max_sleep`, then stores its own
/// name in the context under its name.
pub struct SleepTask {
    name: String,
    max_sleep: Duration,
}

impl SleepTask {
    /// Create a sleeping task.
    pub fn new(name: impl Into<String>, max_sleep: Duration) -> Self {
        Self {
            name: name.into(),
            max_sleep,
        }
    }
}

impl Task for SleepTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, ctx: &ExecutionContext) -> Result<(), TaskError> {
        let millis = random_in_range(0, self.max_sleep.as_millis() as u64);
        thread::sleep(Duration::from_millis(millis));
        ctx.set_object(self.name.clone(), Some(self.name.clone()));
        Ok(())
    }
}

/// A task that fails a configurable number of times before succeeding.
///
/// Safe for concurrent execution; the failure counting is done under a lock.
///
/// # Example
///
/// ```
/// use taskweave::testing::FailingTask;
///
/// // Fails 2 times, then succeeds on the 3rd call
/// let task = FailingTask::new("flaky_task", 2);
/// ```
pub struct FailingTask {
    name: String,
    state: Mutex<FailingTaskState>,
    error_message: String,
}

struct FailingTaskState {
    failures_remaining: u32,
    call_count: u32,
}

impl FailingTask {
    /// Create a task that fails `fail_count` times then succeeds.
    pub fn new(name: impl Into<String>, fail_count: u32) -> Self {
        Self::with_error(name, fail_count, "intentional test failure")
    }

    /// Create a task that fails `fail_count` times with a custom message.
    pub fn with_error(
        name: impl Into<String>,
        fail_count: u32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(FailingTaskState {
                failures_remaining: fail_count,
                call_count: 0,
            }),
            error_message: message.into(),
        }
    }

    /// Create a task that fails on every call with `message`.
    pub fn always(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_error(name, u32::MAX, message)
    }

    /// The message this task fails with.
    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    /// Number of times this task has been called.
    pub fn call_count(&self) -> u32 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .call_count
    }
}

impl Task for FailingTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, ctx: &ExecutionContext) -> Result<(), TaskError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.call_count += 1;

        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            Err(TaskError::failed(self.error_message.clone()))
        } else {
            ctx.set_object(self.name.clone(), Some(true));
            Ok(())
        }
    }
}

/// A task that records the threads it ran on, optionally holding the thread
/// for a fixed time.
pub struct RecordingTask {
    name: String,
    hold: Duration,
    runs: AtomicUsize,
    threads: Mutex<Vec<ThreadId>>,
}

impl RecordingTask {
    /// Create a task that returns immediately.
    pub fn new(name: impl Into<String>) -> Self {
        Self::holding(name, Duration::ZERO)
    }

    /// Create a task that sleeps for `hold` before returning.
    pub fn holding(name: impl Into<String>, hold: Duration) -> Self {
        Self {
            name: name.into(),
            hold,
            runs: AtomicUsize::new(0),
            threads: Mutex::new(Vec::new()),
        }
    }

    /// Number of completed runs.
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    /// Threads this task ran on, in order.
    pub fn threads(&self) -> Vec<ThreadId> {
        self.threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Task for RecordingTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, _ctx: &ExecutionContext) -> Result<(), TaskError> {
        self.threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(thread::current().id());
        if !self.hold.is_zero() {
            thread::sleep(self.hold);
        }
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A dependent task whose dependencies are `width` [`RecordingTask`] leaves.
///
/// After its dependencies finish it records how many leaves had run, so
/// tests can check that the "after" phase observed every child.
pub struct FanOutTask {
    name: String,
    leaves: Vec<Arc<RecordingTask>>,
    dependencies: Dependencies,
    leaves_seen_after: AtomicUsize,
}

impl FanOutTask {
    /// Create a fan-out task with `width` leaves, each holding for `hold`.
    pub fn new(name: impl Into<String>, width: usize, hold: Duration) -> Self {
        let name = name.into();
        let leaves: Vec<Arc<RecordingTask>> = (0..width)
            .map(|i| Arc::new(RecordingTask::holding(format!("{name}-leaf-{i}"), hold)))
            .collect();
        let dependencies = Dependencies::new();
        dependencies.extend(leaves.iter().map(|leaf| -> Arc<dyn Task> { leaf.clone() }));
        Self {
            name,
            leaves,
            dependencies,
            leaves_seen_after: AtomicUsize::new(0),
        }
    }

    /// The leaf tasks.
    pub fn leaves(&self) -> &[Arc<RecordingTask>] {
        &self.leaves
    }

    /// Total runs across all leaves.
    pub fn leaf_runs(&self) -> usize {
        self.leaves.iter().map(|leaf| leaf.runs()).sum()
    }

    /// Leaf runs observed when the "after" phase started.
    pub fn leaves_seen_after(&self) -> usize {
        self.leaves_seen_after.load(Ordering::SeqCst)
    }
}

impl DependentTask for FanOutTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> &Dependencies {
        &self.dependencies
    }

    fn before_dependencies(&self, _ctx: &ExecutionContext) -> Result<(), TaskError> {
        Ok(())
    }

    fn after_dependencies(&self, _ctx: &ExecutionContext) -> Result<(), TaskError> {
        self.leaves_seen_after
            .store(self.leaf_runs(), Ordering::SeqCst);
        Ok(())
    }
}

/// Names and errors of every failed status, in the given order.
///
/// The executor never aggregates failures itself; this is the helper for
/// callers that want a summary.
pub fn collect_failures(statuses: &[TaskStatus]) -> Vec<(String, Arc<TaskError>)> {
    statuses
        .iter()
        .filter_map(|status| {
            status
                .unhandled_failure()
                .map(|err| (status.name().to_string(), err))
        })
        .collect()
}
