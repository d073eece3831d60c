//! Wait-coordinated groups of in-flight task statuses.
//!
//! A [`TaskStatusGroup`] holds the statuses of tasks that are still running.
//! A status is added when its task is launched and removed once the task
//! reaches a terminal state. Membership and the wait condition share one
//! lock, and every membership change wakes all waiters.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::core::types::LaunchId;

use super::status::TaskStatus;

/// A set of in-flight [`TaskStatus`] handles with blocking wait primitives.
///
/// Groups return to the empty state once drained and can be reused for the
/// next batch. `TaskStatusGroup` is `Clone`; clones share membership.
///
/// Waits never fail. A poisoned lock is recovered: group state is only
/// mutated by single inserts and removals, so it is always consistent.
#[derive(Clone, Default)]
pub struct TaskStatusGroup {
    inner: Arc<GroupInner>,
}

#[derive(Default)]
struct GroupInner {
    state: Mutex<GroupState>,
    changed: Condvar,
}

#[derive(Default)]
struct GroupState {
    members: HashMap<LaunchId, TaskStatus>,
    /// Set when any member is removed, cleared by a successful wait-any.
    one_completed: bool,
    /// Set when a wait-any already reported the current empty state.
    empty_reported: bool,
}

impl GroupState {
    fn any_completed(&self) -> bool {
        self.one_completed || (self.members.is_empty() && !self.empty_reported)
    }
}

impl TaskStatusGroup {
    /// Create an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&self, status: TaskStatus) {
        let mut state = self.lock();
        state.members.insert(status.id(), status);
        state.empty_reported = false;
        self.inner.changed.notify_all();
    }

    pub(crate) fn remove(&self, status: &TaskStatus) {
        let mut state = self.lock();
        state.one_completed = true;
        state.members.remove(&status.id());
        self.inner.changed.notify_all();
    }

    /// Block until every member has completed.
    pub fn wait_all_tasks_complete(&self) {
        let _ = self.wait_until(None, |state| state.members.is_empty());
    }

    /// Block until every member has completed or `timeout` elapses.
    ///
    /// Returns `true` iff the group was observed empty before the timeout.
    /// A timed-out wait does not affect the still-running tasks.
    pub fn wait_all_tasks_complete_timeout(&self, timeout: Duration) -> bool {
        self.wait_until(Some(timeout), |state| state.members.is_empty()).0
    }

    /// Block until a member completes.
    ///
    /// See [`wait_any_operation_completes_timeout`](Self::wait_any_operation_completes_timeout).
    pub fn wait_any_operation_completes(&self) {
        self.wait_any(None);
    }

    /// Block until a member completes or `timeout` elapses.
    ///
    /// Returns immediately with `true` if a member completed since the last
    /// successful call, or if the group is empty and that emptiness has not
    /// been reported yet. A successful return clears the "completed" flag so
    /// the next call only reports new completions.
    ///
    /// A task completing after this returns but before the caller inspects
    /// the individual statuses will make the next call return at once, even
    /// if the caller already accounted for that task.
    pub fn wait_any_operation_completes_timeout(&self, timeout: Duration) -> bool {
        self.wait_any(Some(timeout))
    }

    /// Number of members still running.
    pub fn len(&self) -> usize {
        self.lock().members.len()
    }

    /// Whether every member has completed.
    pub fn is_empty(&self) -> bool {
        self.lock().members.is_empty()
    }

    /// Snapshot of the members still running, in no particular order.
    pub fn statuses(&self) -> Vec<TaskStatus> {
        self.lock().members.values().cloned().collect()
    }

    fn wait_any(&self, timeout: Option<Duration>) -> bool {
        let (any_done, mut state) = self.wait_until(timeout, GroupState::any_completed);
        if any_done {
            state.one_completed = false;
            if state.members.is_empty() {
                state.empty_reported = true;
            }
        }
        any_done
    }

    /// Classic condition-variable loop. `None` waits without bound.
    fn wait_until<F>(
        &self,
        timeout: Option<Duration>,
        exit: F,
    ) -> (bool, MutexGuard<'_, GroupState>)
    where
        F: Fn(&GroupState) -> bool,
    {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.lock();
        loop {
            if exit(&state) {
                return (true, state);
            }
            match deadline {
                None => {
                    state = self
                        .inner
                        .changed
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return (false, state);
                    }
                    state = self
                        .inner
                        .changed
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, GroupState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for TaskStatusGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("TaskStatusGroup")
            .field("running", &state.members.len())
            .field("one_completed", &state.one_completed)
            .finish()
    }
}
