//! Recursive quicksort as a stress test of nested dependent tasks.

use std::sync::Arc;
use taskweave::workloads::{random_numbers, shuffled_range, QuickSortTask};

use crate::common::test_executor;

#[test]
fn test_sort_million_shuffled_integers() {
    let executor = test_executor();
    let ctx = executor.context();
    let group = executor.create_tasks_group();
    let task = Arc::new(QuickSortTask::with_threshold(shuffled_range(1_000_000, 42), 1_000));

    let status = executor.launch_in(task.clone(), &ctx, &group);
    group.wait_all_tasks_complete();

    assert!(status.unhandled_failure().is_none());
    assert_eq!(task.take_values(), (0..1_000_000).collect::<Vec<i64>>());
}

#[test]
fn test_repeated_sorts_share_one_group() {
    let executor = test_executor();
    let ctx = executor.context();
    let group = executor.create_tasks_group();

    for round in 0..3_u64 {
        let input = random_numbers(100_000, round);
        let mut expected = input.clone();
        expected.sort_unstable();

        let task = Arc::new(QuickSortTask::with_threshold(input, 500));
        let status = executor.launch_in(task.clone(), &ctx, &group);
        group.wait_all_tasks_complete();

        assert!(status.unhandled_failure().is_none(), "round {round}");
        assert_eq!(task.take_values(), expected, "round {round}");
        assert!(group.is_empty());
    }
}

#[test]
fn test_sort_on_tiny_pool_relies_on_caller_runs() {
    let executor = taskweave::TaskExecutor::new(1, 2, 0);
    let input = random_numbers(50_000, 9);
    let mut expected = input.clone();
    expected.sort_unstable();

    let task = Arc::new(QuickSortTask::with_threshold(input, 256));
    let status = executor.execute(task.clone(), &executor.context());

    assert!(status.unhandled_failure().is_none());
    assert_eq!(task.take_values(), expected);
    assert!(executor.largest_pool_size() <= 2);
}

#[test]
fn test_sort_empty_and_single() {
    let executor = test_executor();
    let ctx = executor.context();

    let empty = Arc::new(QuickSortTask::<i64>::new(Vec::new()));
    assert!(executor.execute(empty.clone(), &ctx).unhandled_failure().is_none());
    assert!(empty.is_empty());

    let single = Arc::new(QuickSortTask::new(vec![7_i64]));
    assert!(executor.execute(single.clone(), &ctx).unhandled_failure().is_none());
    assert_eq!(single.take_values(), vec![7]);
}

#[test]
fn test_sort_strings() {
    let executor = test_executor();
    let input: Vec<String> = random_numbers(20_000, 5)
        .into_iter()
        .map(|n| format!("item-{n}"))
        .collect();
    let mut expected = input.clone();
    expected.sort();

    let task = Arc::new(QuickSortTask::with_threshold(input, 100));
    let status = executor.execute(task.clone(), &executor.context());

    assert!(status.unhandled_failure().is_none());
    assert_eq!(task.take_values(), expected);
}
