//! Bounded OS-thread pool with direct hand-off and an explicit saturation
//! policy.
//!
//! The pool has no work queue. A submitted job is, in order:
//!
//! 1. given to a newly spawned worker while the pool is below its core size,
//! 2. handed directly to an idle worker blocked on the rendezvous channel,
//! 3. given to a newly spawned worker while the pool is below its max size,
//! 4. otherwise handled by the [`SaturationPolicy`].
//!
//! With [`SaturationPolicy::CallerRuns`] the submitting thread runs the job
//! itself before `execute` returns, so submission is not guaranteed to be
//! non-blocking under load.
//!
//! Workers above the core size exit after being idle for the keep-alive
//! duration. Every worker exits once the pool is shut down or dropped;
//! [`ThreadPool::shutdown`] closes the hand-off so idle workers leave at once
//! and busy ones leave after their current job.
//!
//! The pool is reentrant: jobs may submit more jobs and block on them. A
//! tree deeper than the pool can still stall when every level blocks, and
//! caller-runs only narrows that window. Under [`SaturationPolicy::Reject`]
//! such trees record rejections instead of running.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, trace};

/// A unit of work accepted by the pool.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// What the pool does with a job when every worker is busy and the pool is
/// at its maximum size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaturationPolicy {
    /// Run the job synchronously on the submitting thread.
    #[default]
    CallerRuns,
    /// Hand the job back to the submitter without running it.
    Reject,
}

/// Outcome of submitting a job.
pub enum Submission {
    /// A worker thread accepted the job.
    Dispatched,
    /// The pool was saturated and the job ran on the submitting thread.
    RanOnCaller,
    /// The pool was saturated or shut down and the job was returned unrun.
    Rejected(Job),
}

impl std::fmt::Debug for Submission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Submission::Dispatched => f.write_str("Dispatched"),
            Submission::RanOnCaller => f.write_str("RanOnCaller"),
            Submission::Rejected(_) => f.write_str("Rejected"),
        }
    }
}

/// Thread pool with core/max sizing, idle keep-alive and zero-capacity hand-off.
pub struct ThreadPool {
    shared: Arc<PoolShared>,
    handoff: Mutex<Option<Sender<Job>>>,
    receiver: Receiver<Job>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    policy: SaturationPolicy,
    thread_name: String,
}

struct PoolShared {
    core_threads: usize,
    max_threads: usize,
    keep_alive: Duration,
    workers: AtomicUsize,
    largest: AtomicUsize,
    active: AtomicUsize,
    spawned: AtomicUsize,
    shutdown: AtomicBool,
    exit_lock: Mutex<()>,
    exited: Condvar,
}

impl ThreadPool {
    /// Create a pool. No threads are started until work is submitted.
    ///
    /// `max_threads` is raised to at least `max(core_threads, 1)`.
    pub fn new(
        core_threads: usize,
        max_threads: usize,
        keep_alive: Duration,
        policy: SaturationPolicy,
        thread_name: impl Into<String>,
    ) -> Self {
        let max_threads = max_threads.max(core_threads).max(1);
        let (handoff, receiver) = crossbeam_channel::bounded(0);
        Self {
            shared: Arc::new(PoolShared {
                core_threads,
                max_threads,
                keep_alive,
                workers: AtomicUsize::new(0),
                largest: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
                spawned: AtomicUsize::new(0),
                shutdown: AtomicBool::new(false),
                exit_lock: Mutex::new(()),
                exited: Condvar::new(),
            }),
            handoff: Mutex::new(Some(handoff)),
            receiver,
            handles: Mutex::new(Vec::new()),
            policy,
            thread_name: thread_name.into(),
        }
    }

    /// Submit a job.
    ///
    /// After [`shutdown`](Self::shutdown) every job is returned as
    /// [`Submission::Rejected`], whatever the saturation policy.
    pub fn execute(&self, job: Job) -> Submission {
        if self.is_shutdown() {
            debug!("pool shut down, rejecting job");
            return Submission::Rejected(job);
        }

        let job = if self.shared.reserve_worker(self.shared.core_threads) {
            match self.spawn_worker(job) {
                Ok(()) => return Submission::Dispatched,
                Err(job) => job,
            }
        } else {
            job
        };

        let handed = match lock(&self.handoff).as_ref() {
            Some(handoff) => handoff.try_send(job),
            None => return Submission::Rejected(job),
        };
        let job = match handed {
            Ok(()) => {
                trace!("job handed off to idle worker");
                return Submission::Dispatched;
            }
            Err(TrySendError::Full(job)) | Err(TrySendError::Disconnected(job)) => job,
        };

        let job = if self.shared.reserve_worker(self.shared.max_threads) {
            match self.spawn_worker(job) {
                Ok(()) => return Submission::Dispatched,
                Err(job) => job,
            }
        } else {
            job
        };

        match self.policy {
            SaturationPolicy::CallerRuns => {
                debug!("pool saturated, running job on submitting thread");
                run_job(job);
                Submission::RanOnCaller
            }
            SaturationPolicy::Reject => {
                debug!("pool saturated, rejecting job");
                Submission::Rejected(job)
            }
        }
    }

    /// Stop accepting work.
    ///
    /// Jobs already running finish normally; idle workers exit immediately
    /// and busy ones once their current job returns. Calling this more than
    /// once has no further effect.
    pub fn shutdown(&self) {
        if self.shared.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        // dropping the only sender disconnects every parked worker
        drop(lock(&self.handoff).take());
        debug!(workers = self.pool_size(), "pool shut down");
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown.load(Ordering::SeqCst)
    }

    /// Block until every worker has exited after a shutdown, or `timeout`
    /// elapses. Returns `true` if the pool has no workers left.
    ///
    /// Must not be called from a job running on this pool: that worker
    /// cannot exit while it waits for itself.
    pub fn await_termination(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = lock(&self.shared.exit_lock);
        while self.pool_size() > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            guard = self
                .shared
                .exited
                .wait_timeout(guard, remaining)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
        drop(guard);

        for handle in lock(&self.handles).drain(..) {
            if handle.join().is_err() {
                error!("worker thread panicked outside of job capture");
            }
        }
        true
    }

    /// Configured core size.
    pub fn core_threads(&self) -> usize {
        self.shared.core_threads
    }

    /// Configured maximum size.
    pub fn max_threads(&self) -> usize {
        self.shared.max_threads
    }

    /// Configured idle keep-alive for workers above the core size.
    pub fn keep_alive(&self) -> Duration {
        self.shared.keep_alive
    }

    /// Configured saturation policy.
    pub fn policy(&self) -> SaturationPolicy {
        self.policy
    }

    /// Current number of worker threads.
    pub fn pool_size(&self) -> usize {
        self.shared.workers.load(Ordering::SeqCst)
    }

    /// Largest number of worker threads that ever existed at once.
    pub fn largest_pool_size(&self) -> usize {
        self.shared.largest.load(Ordering::SeqCst)
    }

    /// Number of worker threads currently running a job.
    pub fn active_count(&self) -> usize {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// Start a worker whose first job is `job`. The worker slot must already
    /// be reserved; on failure the reservation is released and the job is
    /// handed back.
    fn spawn_worker(&self, job: Job) -> Result<(), Job> {
        let index = self.shared.spawned.fetch_add(1, Ordering::SeqCst);
        let name = format!("{}-{}", self.thread_name, index);
        let first = Arc::new(Mutex::new(Some(job)));

        let shared = Arc::clone(&self.shared);
        let receiver = self.receiver.clone();
        let slot = Arc::clone(&first);
        let spawned = thread::Builder::new().name(name.clone()).spawn(move || {
            let job = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
            worker_loop(shared, receiver, job);
        });

        match spawned {
            Ok(handle) => {
                debug!(worker = %name, "worker started");
                let mut handles = lock(&self.handles);
                handles.retain(|h| !h.is_finished());
                handles.push(handle);
                Ok(())
            }
            Err(e) => {
                error!(worker = %name, error = %e, "failed to spawn worker");
                self.shared.worker_exited();
                // the closure never ran, so the slot still holds the job
                match first.lock().unwrap_or_else(PoisonError::into_inner).take() {
                    Some(job) => Err(job),
                    None => Ok(()),
                }
            }
        }
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("core_threads", &self.shared.core_threads)
            .field("max_threads", &self.shared.max_threads)
            .field("keep_alive", &self.shared.keep_alive)
            .field("policy", &self.policy)
            .field("pool_size", &self.pool_size())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

impl PoolShared {
    /// Atomically claim a worker slot if fewer than `limit` workers exist.
    fn reserve_worker(&self, limit: usize) -> bool {
        let mut current = self.workers.load(Ordering::SeqCst);
        loop {
            if current >= limit {
                return false;
            }
            match self.workers.compare_exchange(
                current,
                current + 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => {
                    self.largest.fetch_max(current + 1, Ordering::SeqCst);
                    return true;
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Release a worker slot and wake anyone awaiting termination.
    fn worker_exited(&self) {
        self.workers.fetch_sub(1, Ordering::SeqCst);
        let _guard = lock(&self.exit_lock);
        self.exited.notify_all();
    }

    /// Release a worker slot if the pool is above its core size.
    fn retire_idle_worker(&self) -> bool {
        let mut current = self.workers.load(Ordering::SeqCst);
        loop {
            if current <= self.core_threads {
                return false;
            }
            match self.workers.compare_exchange(
                current,
                current - 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => {
                    let _guard = lock(&self.exit_lock);
                    self.exited.notify_all();
                    return true;
                }
                Err(actual) => current = actual,
            }
        }
    }

    fn run(&self, job: Job) {
        self.active.fetch_add(1, Ordering::SeqCst);
        run_job(job);
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn run_job(job: Job) {
    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
        error!("job panicked outside of task capture");
    }
}

fn worker_loop(shared: Arc<PoolShared>, receiver: Receiver<Job>, first: Option<Job>) {
    if let Some(job) = first {
        shared.run(job);
    }

    loop {
        let timed = shared.workers.load(Ordering::SeqCst) > shared.core_threads;
        let next = if timed {
            receiver.recv_timeout(shared.keep_alive)
        } else {
            receiver
                .recv()
                .map_err(|_| RecvTimeoutError::Disconnected)
        };

        match next {
            Ok(job) => shared.run(job),
            Err(RecvTimeoutError::Timeout) => {
                if shared.retire_idle_worker() {
                    trace!("idle worker retired after keep-alive");
                    return;
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                shared.worker_exited();
                trace!("hand-off closed, worker exiting");
                return;
            }
        }
    }
}
