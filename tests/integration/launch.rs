//! Launching independent tasks and inspecting their statuses.

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use taskweave::testing::{collect_failures, FailingTask, RecordingTask, SleepTask};
use taskweave::{ExecutorError, Task, TaskError, TaskExecutor};

use crate::common::{assert_all_terminal, test_executor};

#[test]
fn test_ten_sleeping_tasks_write_context() {
    let executor = test_executor();
    let ctx = executor.context();
    let group = executor.create_tasks_group();

    let statuses: Vec<_> = (0..10)
        .map(|i| {
            executor.launch_in(
                Arc::new(SleepTask::new(
                    format!("SimpleTask-{i}"),
                    Duration::from_millis(200),
                )),
                &ctx,
                &group,
            )
        })
        .collect();
    group.wait_all_tasks_complete();

    assert_eq!(statuses.len(), 10);
    assert!(group.is_empty());
    assert_all_terminal(&statuses);
    for status in &statuses {
        assert!(status.unhandled_failure().is_none());
        let value = ctx.get_object::<String>(status.name()).unwrap();
        assert_eq!(value.as_str(), status.task().name());
    }
    assert_eq!(ctx.len(), 10);
}

#[test]
fn test_failing_tasks_keep_their_message() {
    let executor = test_executor();
    let ctx = executor.context();
    let group = executor.create_tasks_group();

    let statuses: Vec<_> = (0..5)
        .map(|i| {
            let name = format!("MyTask_{i}");
            let task = Arc::new(FailingTask::always(name.clone(), name));
            executor.launch_in(task, &ctx, &group)
        })
        .collect();
    group.wait_all_tasks_complete();

    assert_all_terminal(&statuses);
    for status in &statuses {
        let failure = status.unhandled_failure().expect("failure captured");
        assert!(matches!(*failure, TaskError::Failed(_)));
        assert_eq!(failure.to_string(), status.name());
    }
}

#[test]
fn test_mixed_outcomes_are_per_task() {
    let executor = test_executor();
    let ctx = executor.context();
    let tasks: Vec<Arc<dyn Task>> = (0..8)
        .map(|i| -> Arc<dyn Task> {
            if i % 2 == 1 {
                Arc::new(FailingTask::always(format!("task-{i}"), format!("task-{i}-fail")))
            } else {
                Arc::new(RecordingTask::new(format!("task-{i}")))
            }
        })
        .collect();

    let statuses = executor.execute_all(&tasks, &ctx).unwrap();
    let failures = collect_failures(&statuses);

    assert_eq!(failures.len(), 4);
    for (name, err) in failures {
        assert_eq!(err.to_string(), format!("{name}-fail"));
    }
}

#[test]
fn test_execute_all_order_and_count() {
    let executor = TaskExecutor::new(2, 3, 1);
    let ctx = executor.context();
    let tasks: Vec<Arc<dyn Task>> = (0..12)
        .map(|i| -> Arc<dyn Task> {
            Arc::new(SleepTask::new(format!("batch-{i}"), Duration::from_millis(30)))
        })
        .collect();

    let statuses = executor.execute_all(&tasks, &ctx).unwrap();

    assert_eq!(statuses.len(), tasks.len());
    assert_all_terminal(&statuses);
    for (task, status) in tasks.iter().zip(&statuses) {
        assert!(Arc::ptr_eq(task, status.task()));
    }
}

#[test]
fn test_execute_all_empty_is_invalid_argument() {
    let executor = test_executor();

    let result = executor.execute_all(&[], &executor.context());

    assert!(matches!(result, Err(ExecutorError::InvalidArgument(_))));
}

#[test]
fn test_execute_runs_on_calling_thread() {
    let executor = test_executor();
    let task = Arc::new(RecordingTask::holding("inline", Duration::from_millis(10)));

    let status = executor.execute(task.clone(), &executor.context());

    assert!(!status.is_running());
    assert_eq!(task.threads(), vec![thread::current().id()]);
    assert!(status.duration().unwrap() >= Duration::from_millis(10));
}

#[test]
fn test_launch_runs_on_pool_thread() {
    let executor = test_executor();
    let task = Arc::new(RecordingTask::new("pooled"));

    let status = executor.launch(task.clone(), &executor.context());

    assert!(status.wait(Some(Duration::from_secs(5))));
    assert_eq!(task.runs(), 1);
    assert_ne!(task.threads(), vec![thread::current().id()]);
}

#[test]
fn test_same_task_launched_twice_is_tracked_twice() {
    let executor = test_executor();
    let ctx = executor.context();
    let group = executor.create_tasks_group();
    let task = Arc::new(RecordingTask::holding("twice", Duration::from_millis(20)));

    let first = executor.launch_in(task.clone(), &ctx, &group);
    let second = executor.launch_in(task.clone(), &ctx, &group);
    group.wait_all_tasks_complete();

    assert_ne!(first.id(), second.id());
    assert_eq!(task.runs(), 2);
}
