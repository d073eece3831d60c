//! Executor configuration type.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::execution::SaturationPolicy;

use super::error::ConfigError;

/// Construction parameters for a [`TaskExecutor`](crate::TaskExecutor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Workers kept alive even when idle.
    pub min_threads: usize,
    /// Upper bound on concurrently existing workers.
    pub max_threads: usize,
    /// Idle time after which workers above `min_threads` exit, in seconds.
    pub keep_alive_secs: u64,
    /// What to do with new work when every worker is busy at `max_threads`.
    pub saturation: SaturationPolicy,
    /// Prefix for worker thread names.
    pub thread_name: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            min_threads: 4,
            max_threads: 16,
            keep_alive_secs: 60,
            saturation: SaturationPolicy::CallerRuns,
            thread_name: "taskweave-worker".to_string(),
        }
    }
}

impl ExecutorConfig {
    /// Create a config with the given pool sizing and default policy.
    pub fn new(min_threads: usize, max_threads: usize, keep_alive_secs: u64) -> Self {
        Self {
            min_threads,
            max_threads,
            keep_alive_secs,
            ..Self::default()
        }
    }

    /// Set the saturation policy.
    pub fn with_saturation(mut self, saturation: SaturationPolicy) -> Self {
        self.saturation = saturation;
        self
    }

    /// Set the worker thread name prefix.
    pub fn with_thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self
    }

    /// Keep-alive as a [`Duration`].
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    /// Check that the values describe a usable pool.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_threads == 0 {
            return Err(ConfigError::InvalidConfig(
                "max_threads must be greater than zero".to_string(),
            ));
        }
        if self.min_threads > self.max_threads {
            return Err(ConfigError::InvalidConfig(format!(
                "min_threads ({}) must not exceed max_threads ({})",
                self.min_threads, self.max_threads
            )));
        }
        if self.thread_name.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "thread_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
