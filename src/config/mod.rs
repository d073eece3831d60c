//! Executor configuration.
//!
//! Executors can be built from an [`ExecutorConfig`] loaded from YAML:
//!
//! ```yaml
//! min_threads: 4
//! max_threads: 16
//! keep_alive_secs: 60
//! saturation: caller_runs
//! thread_name: taskweave-worker
//! ```

mod error;
mod types;
mod yaml;

pub use error::ConfigError;
pub use types::ExecutorConfig;
pub use yaml::ConfigLoader;
