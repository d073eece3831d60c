//! Common test utilities shared across integration tests.

use std::time::{Duration, Instant};
use taskweave::{TaskExecutor, TaskStatus};

/// A pool roomy enough that most tests never hit saturation.
pub fn test_executor() -> TaskExecutor {
    TaskExecutor::new(15, 30, 0)
}

/// Poll `condition` every few milliseconds until it holds.
///
/// # Panics
///
/// Panics if the timeout is reached first.
pub fn wait_until(what: &str, timeout: Duration, mut condition: impl FnMut() -> bool) {
    let start = Instant::now();
    while !condition() {
        if start.elapsed() > timeout {
            panic!("Timeout waiting for {what}");
        }
        std::thread::sleep(Duration::from_millis(2));
    }
}

/// Assert every status is terminal.
pub fn assert_all_terminal(statuses: &[TaskStatus]) {
    for status in statuses {
        assert!(
            !status.is_running(),
            "task '{}' is still running",
            status.name()
        );
    }
}
