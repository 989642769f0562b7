//! Concurrency pool: fixed number of worker threads draining the work queue.

use anyhow::{Context, Result};
use log::{debug, error, warn};
use std::ops::AddAssign;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::engine::db_ops::TrackingStore;
use crate::{Job, Outcome};

use super::dispatch::Dispatch;
use super::queue::{Dequeue, JobReceiver};

/// Outcomes produced by the pool (or one worker).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub succeeded: usize,
    pub failed: usize,
}

impl PoolStats {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

impl AddAssign for PoolStats {
    fn add_assign(&mut self, other: Self) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
    }
}

/// Dispatch one job and write its outcome back to the store.
pub fn run_job(job: &Job, dispatcher: &dyn Dispatch, store: &TrackingStore) -> Outcome {
    let name = job.name();
    let outcome = dispatcher.dispatch(job);
    match &outcome {
        Outcome::Success => store.record_success(&name, &job.file_path),
        Outcome::Failure(text) => {
            store.record_failure(&name, &job.file_path, text);
        }
    }
    outcome
}

/// Single worker: take jobs until the queue is closed and drained.
fn worker_loop(
    id: usize,
    jobs: JobReceiver,
    dispatcher: Arc<dyn Dispatch>,
    store: Arc<TrackingStore>,
    poll: Duration,
) -> PoolStats {
    let mut stats = PoolStats::default();
    loop {
        match jobs.next(poll) {
            Dequeue::Job(job) => {
                debug!("worker {id}: picked up {}", job.file_path.display());
                if run_job(&job, dispatcher.as_ref(), &store).is_success() {
                    stats.succeeded += 1;
                } else {
                    stats.failed += 1;
                }
            }
            Dequeue::Empty => continue,
            Dequeue::Closed => break,
        }
    }
    debug!("worker {id}: queue closed, exiting");
    stats
}

/// Handles of the running workers.
pub struct WorkerPool {
    handles: Vec<JoinHandle<PoolStats>>,
}

impl WorkerPool {
    /// Start `size` workers (at least one). Each waits at most `poll` per dequeue attempt.
    pub fn spawn(
        size: usize,
        jobs: JobReceiver,
        dispatcher: Arc<dyn Dispatch>,
        store: Arc<TrackingStore>,
        poll: Duration,
    ) -> Result<Self> {
        let size = size.max(1);
        let mut handles = Vec::with_capacity(size);
        for id in 0..size {
            let jobs = jobs.clone();
            let dispatcher = Arc::clone(&dispatcher);
            let store = Arc::clone(&store);
            let handle = thread::Builder::new()
                .name(format!("{}-worker-{id}", env!("CARGO_PKG_NAME")))
                .spawn(move || worker_loop(id, jobs, dispatcher, store, poll))
                .context("spawn worker thread")?;
            handles.push(handle);
        }
        debug!("Started {size} workers");
        Ok(Self { handles })
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker. Returns once all producers are gone and every queued job has an outcome.
    pub fn join(self) -> PoolStats {
        let mut total = PoolStats::default();
        for h in self.handles {
            match h.join() {
                Ok(stats) => total += stats,
                Err(_) => error!("worker thread panicked"),
            }
        }
        if total.failed > 0 {
            warn!(
                "{} of {} jobs failed this run",
                total.failed,
                total.total()
            );
        }
        total
    }
}
