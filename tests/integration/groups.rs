//! Wait-all and wait-any behavior of task groups.

use std::sync::Arc;
use std::time::{Duration, Instant};
use taskweave::testing::RecordingTask;
use taskweave::TaskExecutor;

use crate::common::{test_executor, wait_until};

#[test]
fn test_wait_all_timeout_leaves_running_members() {
    let executor = test_executor();
    let ctx = executor.context();
    let group = executor.create_tasks_group();
    let quick = Arc::new(RecordingTask::new("quick"));
    let slow = Arc::new(RecordingTask::holding("slow", Duration::from_millis(400)));

    let quick_status = executor.launch_in(quick, &ctx, &group);
    let slow_status = executor.launch_in(slow.clone(), &ctx, &group);

    assert!(!group.wait_all_tasks_complete_timeout(Duration::from_millis(50)));
    assert!(quick_status.wait(Some(Duration::from_secs(5))));
    wait_until("quick task to leave the group", Duration::from_secs(5), || {
        group.len() == 1
    });
    assert_eq!(group.statuses()[0].id(), slow_status.id());
    assert!(slow_status.is_running());

    // the timed-out wait did not cancel the slow task
    assert!(group.wait_all_tasks_complete_timeout(Duration::from_secs(5)));
    assert_eq!(slow.runs(), 1);
    assert!(!slow_status.is_running());
}

#[test]
fn test_wait_all_timeout_measures_wall_time() {
    let executor = test_executor();
    let ctx = executor.context();
    let group = executor.create_tasks_group();
    executor.launch_in(
        Arc::new(RecordingTask::holding("slow", Duration::from_millis(500))),
        &ctx,
        &group,
    );

    let start = Instant::now();
    let done = group.wait_all_tasks_complete_timeout(Duration::from_millis(100));
    let waited = start.elapsed();

    assert!(!done);
    assert!(waited >= Duration::from_millis(100));
    assert!(waited < Duration::from_millis(450), "waited {waited:?}");
    group.wait_all_tasks_complete();
}

#[test]
fn test_wait_any_on_empty_group() {
    let executor = test_executor();
    let group = executor.create_tasks_group();

    assert!(group.wait_any_operation_completes_timeout(Duration::ZERO));
    assert!(!group.wait_any_operation_completes_timeout(Duration::from_millis(50)));
}

#[test]
fn test_wait_any_reports_each_completion_round() {
    let executor = test_executor();
    let ctx = executor.context();
    let group = executor.create_tasks_group();
    let holds = [50_u64, 250, 450];
    let statuses: Vec<_> = holds
        .iter()
        .map(|ms| {
            executor.launch_in(
                Arc::new(RecordingTask::holding(
                    format!("hold-{ms}"),
                    Duration::from_millis(*ms),
                )),
                &ctx,
                &group,
            )
        })
        .collect();

    let mut rounds = 0;
    while !group.is_empty() {
        assert!(group.wait_any_operation_completes_timeout(Duration::from_secs(5)));
        rounds += 1;
        assert!(rounds <= holds.len());
    }

    assert!(rounds >= 1);
    assert!(statuses.iter().all(|s| !s.is_running()));
}

#[test]
fn test_wait_any_blocks_until_a_member_finishes() {
    let executor = test_executor();
    let ctx = executor.context();
    let group = executor.create_tasks_group();
    let status = executor.launch_in(
        Arc::new(RecordingTask::holding("slow", Duration::from_millis(100))),
        &ctx,
        &group,
    );

    group.wait_any_operation_completes();

    assert!(!status.is_running());
    assert!(group.is_empty());
}

#[test]
fn test_group_reused_across_batches() {
    let executor = TaskExecutor::new(2, 4, 0);
    let ctx = executor.context();
    let group = executor.create_tasks_group();

    for batch in 0..3 {
        let tasks: Vec<_> = (0..5)
            .map(|i| Arc::new(RecordingTask::new(format!("batch-{batch}-{i}"))))
            .collect();
        for task in &tasks {
            executor.launch_in(task.clone(), &ctx, &group);
        }
        group.wait_all_tasks_complete();

        assert!(group.is_empty());
        assert!(tasks.iter().all(|t| t.runs() == 1));
    }
}

#[test]
fn test_groups_are_independent() {
    let executor = test_executor();
    let ctx = executor.context();
    let fast_group = executor.create_tasks_group();
    let slow_group = executor.create_tasks_group();

    executor.launch_in(
        Arc::new(RecordingTask::holding("slow", Duration::from_millis(300))),
        &ctx,
        &slow_group,
    );
    executor.launch_in(Arc::new(RecordingTask::new("fast")), &ctx, &fast_group);

    assert!(fast_group.wait_all_tasks_complete_timeout(Duration::from_secs(5)));
    assert!(!slow_group.is_empty());
    wait_until("slow group to drain", Duration::from_secs(5), || {
        slow_group.is_empty()
    });
}
