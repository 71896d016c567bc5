//! Bounded job queue.
//!
//! A fixed-capacity FIFO between the ingestion side and the worker pool.
//! Producers wait while the queue is full; jobs are never dropped. Every
//! worker holds a clone of the [`JobReceiver`], and the receiver itself sits
//! behind an async mutex so that exactly one worker takes each job.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

use vault_core::models::ProcessingJob;

#[derive(Debug, Error)]
pub enum QueueError {
    /// Returned by [`JobQueue::try_enqueue`] when every slot is taken.
    #[error("Job queue is full")]
    Full(ProcessingJob),

    /// Every receiver has been dropped; no worker will ever take the job.
    #[error("Job queue is closed")]
    Closed(ProcessingJob),
}

impl QueueError {
    /// Recover the job that could not be enqueued.
    pub fn into_job(self) -> ProcessingJob {
        match self {
            QueueError::Full(job) | QueueError::Closed(job) => job,
        }
    }
}

/// Create a queue holding at most `capacity` jobs. A capacity of zero is
/// raised to one.
pub fn job_queue(capacity: usize) -> (JobQueue, JobReceiver) {
    let capacity = capacity.max(1);
    let (tx, rx) = mpsc::channel(capacity);
    (
        JobQueue { tx, capacity },
        JobReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Producer handle. Cloning it adds a producer; the queue closes once every
/// producer handle is dropped and the remaining jobs are drained.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<ProcessingJob>,
    capacity: usize,
}

impl JobQueue {
    /// Append a job, waiting for a free slot while the queue is full.
    #[tracing::instrument(skip(self, job), fields(media.id = %job.id, job.mime = %job.mime_type))]
    pub async fn enqueue(&self, job: ProcessingJob) -> Result<(), QueueError> {
        if self.tx.capacity() == 0 {
            tracing::debug!(capacity = self.capacity, "Job queue full, waiting for a slot");
        }
        self.tx
            .send(job)
            .await
            .map_err(|mpsc::error::SendError(job)| QueueError::Closed(job))?;
        tracing::debug!(queued = self.len(), "Job enqueued");
        Ok(())
    }

    /// Blocking variant of [`JobQueue::enqueue`] for producers on plain OS
    /// threads. Must not be called from within an async context.
    pub fn enqueue_blocking(&self, job: ProcessingJob) -> Result<(), QueueError> {
        self.tx
            .blocking_send(job)
            .map_err(|mpsc::error::SendError(job)| QueueError::Closed(job))
    }

    /// Append a job only if a slot is free right now.
    pub fn try_enqueue(&self, job: ProcessingJob) -> Result<(), QueueError> {
        self.tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(job) => QueueError::Full(job),
            mpsc::error::TrySendError::Closed(job) => QueueError::Closed(job),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of jobs currently waiting.
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Consumer handle shared by the workers.
#[derive(Clone)]
pub struct JobReceiver {
    rx: Arc<Mutex<mpsc::Receiver<ProcessingJob>>>,
}

impl JobReceiver {
    /// Wait for the next job. Returns `None` once all producers are gone and
    /// the queue is empty.
    pub async fn dequeue(&self) -> Option<ProcessingJob> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }
}
