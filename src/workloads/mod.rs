//! Ready-made workloads built on the executor, plus input generators.
//!
//! Used by the `tw` binary, the benchmarks and the integration tests.

mod quicksort;

pub use quicksort::{QuickSortTask, DEFAULT_SORT_THRESHOLD};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// The integers `0..len` in an order determined by `seed`.
pub fn shuffled_range(len: usize, seed: u64) -> Vec<i64> {
    let mut values: Vec<i64> = (0..len as i64).collect();
    values.shuffle(&mut StdRng::seed_from_u64(seed));
    values
}

/// `len` random integers (duplicates allowed) determined by `seed`.
pub fn random_numbers(len: usize, seed: u64) -> Vec<i64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-1_000_000..1_000_000)).collect()
}

/// A random integer in `min..max`, or `min` when the range is empty.
pub fn random_in_range(min: u64, max: u64) -> u64 {
    if max <= min {
        return min;
    }
    rand::thread_rng().gen_range(min..max)
}
