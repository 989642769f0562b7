//! Work queue: unbounded FIFO of jobs between detection and the worker pool.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use std::time::Duration;

use crate::Job;

/// Result of one bounded wait on the queue.
#[derive(Debug)]
pub enum Dequeue {
    Job(Job),
    /// Nothing arrived within the poll interval.
    Empty,
    /// Every producer is gone and the queue is drained.
    Closed,
}

/// Producer handle. Cloneable; the queue closes once every clone is dropped.
#[derive(Clone, Debug)]
pub struct JobSender {
    tx: Sender<Job>,
}

impl JobSender {
    /// Enqueue without blocking. Returns false if no consumer is left.
    pub fn submit(&self, job: Job) -> bool {
        self.tx.send(job).is_ok()
    }

    /// Jobs waiting to be picked up.
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

/// Consumer handle, shared by the pool workers.
#[derive(Clone, Debug)]
pub struct JobReceiver {
    rx: Receiver<Job>,
}

impl JobReceiver {
    /// Wait up to `poll` for the next job. Queued jobs are still delivered after the producers
    /// are gone; `Closed` only comes once the queue is empty.
    pub fn next(&self, poll: Duration) -> Dequeue {
        match self.rx.recv_timeout(poll) {
            Ok(job) => Dequeue::Job(job),
            Err(RecvTimeoutError::Timeout) => Dequeue::Empty,
            Err(RecvTimeoutError::Disconnected) => Dequeue::Closed,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Create a connected producer/consumer pair.
pub fn work_queue() -> (JobSender, JobReceiver) {
    let (tx, rx) = unbounded::<Job>();
    (JobSender { tx }, JobReceiver { rx })
}
