//! Per-launch completion tracking.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::core::task::{Task, TaskError};
use crate::core::types::LaunchId;

/// Handle tracking one launched task.
///
/// A status starts running and transitions to completed exactly once. If the
/// task body failed, the error is kept as the status's unhandled failure.
/// Nothing else reports the failure: callers must inspect
/// [`unhandled_failure`](Self::unhandled_failure) themselves.
///
/// `TaskStatus` is `Clone`; clones observe the same launch.
#[derive(Clone)]
pub struct TaskStatus {
    inner: Arc<StatusInner>,
}

struct StatusInner {
    id: LaunchId,
    task: Arc<dyn Task>,
    state: Mutex<StatusState>,
    done: Condvar,
}

#[derive(Default)]
struct StatusState {
    completed: bool,
    failure: Option<Arc<TaskError>>,
    duration: Option<Duration>,
}

impl TaskStatus {
    pub(crate) fn new(task: Arc<dyn Task>) -> Self {
        Self {
            inner: Arc::new(StatusInner {
                id: LaunchId::new(),
                task,
                state: Mutex::new(StatusState::default()),
                done: Condvar::new(),
            }),
        }
    }

    /// Record the outcome of the task body and wake anyone waiting on it.
    ///
    /// Only the first call has an effect.
    pub(crate) fn complete(&self, outcome: Result<(), TaskError>, duration: Duration) {
        let mut state = self.lock();
        if state.completed {
            return;
        }
        state.failure = outcome.err().map(Arc::new);
        state.duration = Some(duration);
        state.completed = true;
        self.inner.done.notify_all();
    }

    /// Identifier of this launch.
    pub fn id(&self) -> LaunchId {
        self.inner.id
    }

    /// The task this status tracks.
    pub fn task(&self) -> &Arc<dyn Task> {
        &self.inner.task
    }

    /// Name of the tracked task.
    pub fn name(&self) -> &str {
        self.inner.task.name()
    }

    /// Whether the task has not yet reached a terminal state.
    pub fn is_running(&self) -> bool {
        !self.lock().completed
    }

    /// Whether the task has reached a terminal state.
    pub fn is_completed(&self) -> bool {
        self.lock().completed
    }

    /// Whether the task completed with a failure.
    pub fn is_failed(&self) -> bool {
        self.lock().failure.is_some()
    }

    /// The error the task body returned or panicked with, if any.
    pub fn unhandled_failure(&self) -> Option<Arc<TaskError>> {
        self.lock().failure.clone()
    }

    /// Wall time spent in the task body, once completed.
    pub fn duration(&self) -> Option<Duration> {
        self.lock().duration
    }

    /// Block until this task completes or `timeout` elapses.
    ///
    /// `None` waits without bound. Returns whether the task completed.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.lock();
        while !state.completed {
            match deadline {
                None => {
                    state = self
                        .inner
                        .done
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    state = self
                        .inner
                        .done
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
            }
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, StatusState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("TaskStatus")
            .field("id", &self.inner.id)
            .field("task", &self.inner.task.name())
            .field("completed", &state.completed)
            .field("failure", &state.failure)
            .finish()
    }
}
