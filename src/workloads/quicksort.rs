//! Divide-and-conquer quicksort expressed as nested dependent tasks.
//!
//! Each task owns its slice of the input. Before its dependencies run it
//! partitions the slice around a pivot and registers one child task per
//! side; after they finish it concatenates the sorted sides. Slices at or
//! below the threshold are sorted inline without spawning children.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::core::context::ExecutionContext;
use crate::core::task::{Dependencies, DependentTask, TaskError};

/// Slices of this length or shorter are sorted without spawning children.
pub const DEFAULT_SORT_THRESHOLD: usize = 1_024;

/// Dependent task sorting its values by recursive partitioning.
pub struct QuickSortTask<T> {
    name: String,
    depth: usize,
    threshold: usize,
    values: Mutex<Vec<T>>,
    partition: Mutex<Option<Partition<T>>>,
    dependencies: Dependencies,
}

struct Partition<T> {
    lower: Arc<QuickSortTask<T>>,
    pivots: Vec<T>,
    upper: Arc<QuickSortTask<T>>,
}

impl<T> QuickSortTask<T>
where
    T: Ord + Clone + Send + 'static,
{
    /// Create a root sorting task with the default threshold.
    pub fn new(values: Vec<T>) -> Self {
        Self::with_threshold(values, DEFAULT_SORT_THRESHOLD)
    }

    /// Create a root sorting task that sorts slices of `threshold` or fewer
    /// elements inline. A threshold of zero is treated as one.
    pub fn with_threshold(values: Vec<T>, threshold: usize) -> Self {
        Self::child(values, threshold.max(1), 0)
    }

    fn child(values: Vec<T>, threshold: usize, depth: usize) -> Self {
        Self {
            name: format!("quicksort[depth={depth}, len={}]", values.len()),
            depth,
            threshold,
            values: Mutex::new(values),
            partition: Mutex::new(None),
            dependencies: Dependencies::new(),
        }
    }

    /// Recursion depth of this task; zero for the root.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Take the values out of the task. Sorted once the task has run.
    pub fn take_values(&self) -> Vec<T> {
        std::mem::take(&mut *lock(&self.values))
    }

    /// Number of values currently held.
    pub fn len(&self) -> usize {
        lock(&self.values).len()
    }

    /// Whether the task holds no values.
    pub fn is_empty(&self) -> bool {
        lock(&self.values).is_empty()
    }
}

impl<T> DependentTask for QuickSortTask<T>
where
    T: Ord + Clone + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> &Dependencies {
        &self.dependencies
    }

    fn before_dependencies(&self, _ctx: &ExecutionContext) -> Result<(), TaskError> {
        let mut values = lock(&self.values);
        if values.len() <= self.threshold {
            values.sort_unstable();
            return Ok(());
        }

        let pivot = values[values.len() / 2].clone();
        let mut lower = Vec::new();
        let mut pivots = Vec::new();
        let mut upper = Vec::new();
        for value in values.drain(..) {
            match value.cmp(&pivot) {
                std::cmp::Ordering::Less => lower.push(value),
                std::cmp::Ordering::Equal => pivots.push(value),
                std::cmp::Ordering::Greater => upper.push(value),
            }
        }

        let lower = Arc::new(Self::child(lower, self.threshold, self.depth + 1));
        let upper = Arc::new(Self::child(upper, self.threshold, self.depth + 1));
        self.dependencies.push(lower.clone());
        self.dependencies.push(upper.clone());
        *lock(&self.partition) = Some(Partition {
            lower,
            pivots,
            upper,
        });
        Ok(())
    }

    fn after_dependencies(&self, _ctx: &ExecutionContext) -> Result<(), TaskError> {
        let Some(partition) = lock(&self.partition).take() else {
            return Ok(());
        };

        let mut sorted = partition.lower.take_values();
        sorted.extend(partition.pivots);
        sorted.extend(partition.upper.take_values());
        *lock(&self.values) = sorted;
        Ok(())
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
