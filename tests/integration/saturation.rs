//! Pool sizing and behavior once every worker is busy.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use taskweave::testing::RecordingTask;
use taskweave::{
    ExecutionContext, ExecutorConfig, SaturationPolicy, Task, TaskError, TaskExecutor,
};

use crate::common::wait_until;

struct ThreadNameTask {
    seen: Mutex<Option<String>>,
}

impl Task for ThreadNameTask {
    fn name(&self) -> &str {
        "thread-name"
    }

    fn execute(&self, _ctx: &ExecutionContext) -> Result<(), TaskError> {
        *self.seen.lock().unwrap() = thread::current().name().map(str::to_string);
        Ok(())
    }
}

/// Occupy the single worker of `executor` for `hold`.
fn occupy_worker(executor: &TaskExecutor, hold: Duration) -> Arc<RecordingTask> {
    let blocker = Arc::new(RecordingTask::holding("blocker", hold));
    executor.launch(blocker.clone(), &executor.context());
    wait_until("worker to pick up the blocker", Duration::from_secs(5), || {
        executor.active_count() == 1
    });
    blocker
}

#[test]
fn test_saturated_launch_runs_on_caller() {
    let executor = TaskExecutor::new(1, 1, 0);
    let blocker = occupy_worker(&executor, Duration::from_millis(300));

    let task = Arc::new(RecordingTask::holding("inline", Duration::from_millis(100)));
    let start = Instant::now();
    let status = executor.launch(task.clone(), &executor.context());
    let took = start.elapsed();

    // launch only returned once the task had finished on this thread
    assert!(took >= Duration::from_millis(100), "took {took:?}");
    assert!(!status.is_running());
    assert!(status.unhandled_failure().is_none());
    assert_eq!(task.threads(), vec![thread::current().id()]);
    assert_eq!(executor.pool_size(), 1);

    wait_until("blocker to finish", Duration::from_secs(5), || {
        blocker.runs() == 1
    });
    assert_ne!(blocker.threads(), vec![thread::current().id()]);
}

#[test]
fn test_reject_policy_completes_status_with_error() {
    let config = ExecutorConfig::new(1, 1, 0).with_saturation(SaturationPolicy::Reject);
    let executor = TaskExecutor::from_config(&config).unwrap();
    assert_eq!(executor.saturation_policy(), SaturationPolicy::Reject);
    let _blocker = occupy_worker(&executor, Duration::from_millis(300));

    let task = Arc::new(RecordingTask::new("turned-away"));
    let group = executor.create_tasks_group();
    let status = executor.launch_in(task.clone(), &executor.context(), &group);

    assert!(!status.is_running());
    let failure = status.unhandled_failure().expect("rejection recorded");
    assert!(matches!(&*failure, TaskError::Rejected(name) if name == "turned-away"));
    assert!(group.is_empty());
    assert_eq!(task.runs(), 0);
}

#[test]
fn test_pool_grows_to_max_then_shrinks_to_core() {
    let executor = TaskExecutor::new(1, 4, 0);
    let ctx = executor.context();
    let group = executor.create_tasks_group();
    let tasks: Vec<_> = (0..4)
        .map(|i| Arc::new(RecordingTask::holding(format!("hold-{i}"), Duration::from_millis(200))))
        .collect();

    for task in &tasks {
        executor.launch_in(task.clone(), &ctx, &group);
    }
    assert_eq!(executor.largest_pool_size(), 4);
    // every task went to a worker, none ran on the caller
    assert!(tasks
        .iter()
        .all(|t| t.threads().iter().all(|id| *id != thread::current().id())));

    group.wait_all_tasks_complete();
    wait_until("idle workers to retire", Duration::from_secs(5), || {
        executor.pool_size() == 1
    });
    assert_eq!(executor.largest_pool_size(), 4);
}

#[test]
fn test_worker_threads_use_configured_name() {
    let config = ExecutorConfig::new(1, 2, 0).with_thread_name("sorter");
    let executor = TaskExecutor::from_config(&config).unwrap();
    let task = Arc::new(ThreadNameTask {
        seen: Mutex::new(None),
    });

    let status = executor.launch(task.clone(), &executor.context());
    assert!(status.wait(Some(Duration::from_secs(5))));

    let seen = task.seen.lock().unwrap().clone().unwrap_or_default();
    assert!(seen.starts_with("sorter-"), "thread name {seen:?}");
}

#[test]
fn test_invalid_config_is_refused() {
    let config = ExecutorConfig::new(8, 2, 0);
    assert!(TaskExecutor::from_config(&config).is_err());
}
