//! Fixed-size worker pool.
//!
//! Shutdown: [`WorkerPool::shutdown`] stops every worker from taking new jobs
//! and waits for jobs already running to finish. [`WorkerPool::join`] instead
//! waits for the workers to exit on their own, which happens once every
//! producer handle is dropped and the queue is drained.

use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::context::JobHandler;
use crate::queue::JobReceiver;

#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    pub workers: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self { workers: 4 }
    }
}

pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    shutdown: CancellationToken,
}

impl WorkerPool {
    /// Spawn the workers. A worker count of zero is raised to one.
    pub fn start(
        receiver: JobReceiver,
        handler: Arc<dyn JobHandler>,
        config: WorkerPoolConfig,
    ) -> Self {
        let workers = config.workers.max(1);
        let shutdown = CancellationToken::new();

        let handles = (0..workers)
            .map(|worker_id| {
                tokio::spawn(Self::run_worker(
                    worker_id,
                    receiver.clone(),
                    handler.clone(),
                    shutdown.clone(),
                ))
            })
            .collect();

        tracing::info!(workers = workers, "Worker pool started");
        Self { handles, shutdown }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    async fn run_worker(
        worker_id: usize,
        receiver: JobReceiver,
        handler: Arc<dyn JobHandler>,
        shutdown: CancellationToken,
    ) {
        loop {
            let job = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                job = receiver.dequeue() => match job {
                    Some(job) => job,
                    None => break,
                },
            };

            let media_id = job.id;
            let mime = job.mime_type.clone();
            let started = Instant::now();
            let handler = handler.clone();

            // A panicking handler only takes down its own task.
            let outcome = tokio::spawn(async move { handler.handle(job).await }).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok(Ok(())) => {
                    tracing::debug!(
                        worker_id = worker_id,
                        media.id = %media_id,
                        job.mime = %mime,
                        duration_ms = duration_ms,
                        "Job finished"
                    );
                }
                Ok(Err(e)) => {
                    tracing::error!(
                        worker_id = worker_id,
                        media.id = %media_id,
                        job.mime = %mime,
                        duration_ms = duration_ms,
                        error = %e,
                        "Job processing failed"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        worker_id = worker_id,
                        media.id = %media_id,
                        job.mime = %mime,
                        error = %e,
                        "Job handler panicked"
                    );
                }
            }
        }

        tracing::debug!(worker_id = worker_id, "Worker stopped");
    }

    /// Stop taking new jobs and wait for running jobs to finish. Jobs still
    /// queued are left in the queue.
    pub async fn shutdown(self) {
        tracing::info!("Initiating worker pool shutdown");
        self.shutdown.cancel();
        self.join().await;
    }

    /// Wait for every worker to exit.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Worker task terminated abnormally");
            }
        }
        tracing::info!("Worker pool stopped");
    }
}
