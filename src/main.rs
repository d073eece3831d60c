//! tw - run taskweave workloads from the command line.
//!
//! Usage:
//!   tw sort --size <N>            Sort N random integers with recursive dependent tasks
//!   tw fanout --tasks <N>         Launch N sleeping tasks into one group and wait
//!   tw validate <CONFIG>          Validate an executor configuration file

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use taskweave::testing::SleepTask;
use taskweave::workloads::{random_numbers, QuickSortTask, DEFAULT_SORT_THRESHOLD};
use taskweave::{ConfigLoader, ExecutorConfig, TaskExecutor};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// tw - a thread-pool task executor with recursive dependent tasks
#[derive(Parser)]
#[command(name = "tw")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Executor configuration file (YAML)
    #[arg(short, long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sort random integers with a recursive quicksort task tree
    Sort {
        /// Number of integers to sort
        #[arg(short, long, default_value = "1000000")]
        size: usize,

        /// Slices at or below this length are sorted inline
        #[arg(short, long, default_value_t = DEFAULT_SORT_THRESHOLD)]
        threshold: usize,

        /// Seed for the random input
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Launch independent sleeping tasks into one group and wait for them
    Fanout {
        /// Number of tasks to launch
        #[arg(short, long, default_value = "10")]
        tasks: usize,

        /// Upper bound of each task's random sleep, in milliseconds
        #[arg(long, default_value = "200")]
        max_sleep_ms: u64,
    },

    /// Validate an executor configuration file
    Validate {
        /// Path to the configuration file
        #[arg(value_name = "CONFIG")]
        path: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sort {
            size,
            threshold,
            seed,
        } => {
            let executor = build_executor(cli.config.as_deref())?;
            let result = run_sort(&executor, size, threshold, seed);
            stop_executor(&executor);
            result?;
        }
        Commands::Fanout {
            tasks,
            max_sleep_ms,
        } => {
            let executor = build_executor(cli.config.as_deref())?;
            let result = run_fanout(&executor, tasks, Duration::from_millis(max_sleep_ms));
            stop_executor(&executor);
            result?;
        }
        Commands::Validate { path } => {
            validate_config(&path)?;
        }
    }

    Ok(())
}

/// Build an executor from the config file, or from defaults.
fn build_executor(path: Option<&Path>) -> Result<TaskExecutor, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => {
            info!("Loading executor config from: {}", path.display());
            ConfigLoader::load_file(path)?
        }
        None => ExecutorConfig::default(),
    };
    info!(
        "Executor: {}..{} threads, keep-alive {}s, {:?} on saturation",
        config.min_threads, config.max_threads, config.keep_alive_secs, config.saturation
    );
    Ok(TaskExecutor::from_config(&config)?)
}

/// Shut the pool down and wait briefly for its workers to exit.
fn stop_executor(executor: &TaskExecutor) {
    executor.shutdown();
    if !executor.await_termination(Duration::from_secs(5)) {
        warn!("Workers still running after shutdown");
    }
}

/// Sort random integers and compare against a single-threaded sort.
fn run_sort(
    executor: &TaskExecutor,
    size: usize,
    threshold: usize,
    seed: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let input = random_numbers(size, seed);
    let mut expected = input.clone();

    let start = Instant::now();
    expected.sort_unstable();
    let sequential = start.elapsed();

    let task = Arc::new(QuickSortTask::with_threshold(input, threshold));
    let start = Instant::now();
    let status = executor.execute(task.clone(), &executor.context());
    let parallel = start.elapsed();

    if let Some(err) = status.unhandled_failure() {
        error!("Sort failed: {}", err);
        return Err(format!("sort failed: {err}").into());
    }

    let sorted = task.take_values();
    if sorted != expected {
        error!("Result differs from sequential sort");
        return Err("sort produced wrong order".into());
    }

    info!(
        "Sorted {} integers in {:?} (sequential: {:?}, peak workers: {})",
        size,
        parallel,
        sequential,
        executor.largest_pool_size()
    );
    Ok(())
}

/// Launch sleeping tasks into one group and report their statuses.
fn run_fanout(
    executor: &TaskExecutor,
    tasks: usize,
    max_sleep: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    if tasks == 0 {
        warn!("Nothing to launch");
        return Ok(());
    }

    let ctx = executor.context();
    let group = executor.create_tasks_group();
    let start = Instant::now();
    let statuses: Vec<_> = (0..tasks)
        .map(|i| {
            executor.launch_in(
                Arc::new(SleepTask::new(format!("task-{i}"), max_sleep)),
                &ctx,
                &group,
            )
        })
        .collect();

    while !group.wait_any_operation_completes_timeout(Duration::from_secs(1)) {
        info!("Waiting, {} task(s) still running", group.len());
    }
    group.wait_all_tasks_complete();

    for status in &statuses {
        let took = status.duration().unwrap_or_default();
        match status.unhandled_failure() {
            Some(err) => error!("  {} failed after {:?}: {}", status.name(), took, err),
            None => info!("  {} completed in {:?}", status.name(), took),
        }
    }
    info!(
        "{} task(s) finished in {:?}, {} context key(s) written",
        statuses.len(),
        start.elapsed(),
        ctx.len()
    );
    Ok(())
}

/// Validate a configuration file without running anything.
fn validate_config(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    info!("Validating config: {}", path.display());

    match ConfigLoader::load_file(path) {
        Ok(config) => {
            info!("Config is valid: {:?}", config);
            Ok(())
        }
        Err(e) => {
            error!("Validation failed: {}", e);
            Err(e.into())
        }
    }
}
