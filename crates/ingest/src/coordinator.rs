//! Parallel ingestion of many source files over a bounded worker pool.
//!
//! Every path becomes one independent decode-and-validate task. Results are
//! gathered by blocking on each task's handle in submission order, so the
//! aggregated `jobs`/`errors` follow the input order no matter which worker
//! finishes first. A failing file contributes one [`FileError`] and never
//! aborts the batch.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use jobmig_core::{IngestConfig, JobRecord, MigrationError, Result};

use crate::decoder::RecordDecoder;

/// A per-file failure: decode and validation errors are reported alike.
#[derive(Debug)]
pub struct FileError {
    pub path: PathBuf,
    pub error: MigrationError,
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "File: {}, Error: {}", self.path.display(), self.error)
    }
}

/// Aggregated result of one [`IngestCoordinator::parse_many`] call.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    /// Records from every successful file, in input-path order.
    pub jobs: Vec<JobRecord>,
    /// One entry per failed file, in input-path order.
    pub errors: Vec<FileError>,
    /// Number of files that decoded and validated.
    pub files_parsed: usize,
}

impl ParseOutcome {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn total_jobs(&self) -> usize {
        self.jobs.len()
    }

    pub fn files_attempted(&self) -> usize {
        self.files_parsed + self.errors.len()
    }
}

/// Count of submitted tasks that have not finished yet.
#[derive(Debug, Default)]
struct InFlight {
    count: Mutex<usize>,
    idle: Condvar,
}

impl InFlight {
    fn enter(self: &Arc<Self>) -> InFlightGuard {
        *self.lock() += 1;
        InFlightGuard(Arc::clone(self))
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn outstanding(&self) -> usize {
        *self.lock()
    }

    /// Block until no task is in flight or `timeout` elapses. Returns whether idle.
    fn wait_idle(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .idle
            .wait_timeout_while(guard, timeout, |count| *count > 0)
            .unwrap_or_else(PoisonError::into_inner);
        *guard == 0
    }
}

/// Decrements the in-flight count when a task ends, including by panic.
struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut count = self.0.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.0.idle.notify_all();
        }
    }
}

/// Fans file paths out over a fixed-size worker pool and fans the results
/// back in, in submission order.
pub struct IngestCoordinator {
    decoder: Arc<dyn RecordDecoder>,
    /// `None` once shut down; no work is accepted after that.
    pool: Mutex<Option<rayon::ThreadPool>>,
    in_flight: Arc<InFlight>,
    workers: usize,
    shutdown_grace: Duration,
}

impl IngestCoordinator {
    /// Build a coordinator with `config.resolved_worker_threads()` workers.
    pub fn new(decoder: Arc<dyn RecordDecoder>, config: &IngestConfig) -> Result<Self> {
        let workers = config.resolved_worker_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("jobmig-ingest-{i}"))
            .panic_handler(|payload| {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                warn!(%reason, "ingest worker panicked");
            })
            .build()
            .map_err(|e| MigrationError::WorkerPool(e.to_string()))?;

        info!(workers, grace_secs = config.shutdown_grace_secs, "ingest pool started");

        Ok(Self {
            decoder,
            pool: Mutex::new(Some(pool)),
            in_flight: Arc::new(InFlight::default()),
            workers,
            shutdown_grace: config.shutdown_grace(),
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn is_shut_down(&self) -> bool {
        self.lock_pool().is_none()
    }

    fn lock_pool(&self) -> MutexGuard<'_, Option<rayon::ThreadPool>> {
        self.pool.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decode and validate every path in parallel.
    ///
    /// Blocks until every submitted file has been handled. Fails only with
    /// [`MigrationError::PoolShutDown`] when called after [`shutdown`](Self::shutdown);
    /// per-file problems are reported in [`ParseOutcome::errors`].
    pub fn parse_many<P: AsRef<Path>>(&self, paths: &[P]) -> Result<ParseOutcome> {
        let start = Instant::now();
        let handles = self.submit(paths)?;

        let mut outcome = ParseOutcome::default();
        for (path, handle) in handles {
            match handle.recv() {
                Ok(Ok(jobs)) => {
                    debug!(path = %path.display(), jobs = jobs.len(), "file ingested");
                    outcome.jobs.extend(jobs);
                    outcome.files_parsed += 1;
                }
                Ok(Err(error)) => {
                    warn!(path = %path.display(), %error, "file rejected");
                    outcome.errors.push(FileError { path, error });
                }
                // Sender dropped without a result: the task panicked.
                Err(_) => {
                    let error = MigrationError::WorkerLost(path.clone());
                    warn!(path = %path.display(), %error, "file lost");
                    outcome.errors.push(FileError { path, error });
                }
            }
        }

        info!(
            files = outcome.files_attempted(),
            jobs = outcome.total_jobs(),
            failed = outcome.errors.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "ingestion batch finished"
        );
        Ok(outcome)
    }

    /// Spawn one task per path; the pool lock is held only while spawning.
    fn submit<P: AsRef<Path>>(
        &self,
        paths: &[P],
    ) -> Result<Vec<(PathBuf, Receiver<Result<Vec<JobRecord>>>)>> {
        let pool = self.lock_pool();
        let pool = pool.as_ref().ok_or(MigrationError::PoolShutDown)?;

        let mut handles = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref().to_path_buf();
            let (tx, rx) = mpsc::sync_channel(1);
            let decoder = Arc::clone(&self.decoder);
            let guard = self.in_flight.enter();
            let task_path = path.clone();

            pool.spawn(move || {
                let _guard = guard;
                let result = decode_and_validate(decoder.as_ref(), &task_path);
                // The receiver is gone only if the caller stopped waiting.
                let _ = tx.send(result);
            });
            handles.push((path, rx));
        }

        debug!(files = handles.len(), "ingestion batch submitted");
        Ok(handles)
    }

    /// Stop accepting work and wait up to the grace period for in-flight files.
    ///
    /// Returns `true` when everything finished in time. Past the grace period
    /// the remaining tasks are abandoned: the pool is released and its threads
    /// exit once their current work ends. Calling this again does not wait; it
    /// only reports whether nothing is still running.
    pub fn shutdown(&self) -> bool {
        let Some(pool) = self.lock_pool().take() else {
            return self.in_flight.outstanding() == 0;
        };
        info!(grace_ms = self.shutdown_grace.as_millis() as u64, "ingest pool shutting down");

        let drained = self.in_flight.wait_idle(self.shutdown_grace);
        if !drained {
            warn!(
                outstanding = self.in_flight.outstanding(),
                "shutdown grace period elapsed, abandoning in-flight files"
            );
        }

        drop(pool);
        drained
    }
}

impl fmt::Debug for IngestCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestCoordinator")
            .field("workers", &self.workers)
            .field("shutdown_grace", &self.shutdown_grace)
            .field("in_flight", &self.in_flight.outstanding())
            .finish()
    }
}

fn decode_and_validate(decoder: &dyn RecordDecoder, path: &Path) -> Result<Vec<JobRecord>> {
    let jobs = decoder.decode(path)?;
    decoder.validate_structure(&jobs)?;
    Ok(jobs)
}
