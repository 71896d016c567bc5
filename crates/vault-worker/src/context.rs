//! Job handler trait
//!
//! The processing layer implements this trait; each worker calls `handle`
//! once per dequeued job.

use anyhow::Result;
use async_trait::async_trait;

use vault_core::models::ProcessingJob;

#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Process one job. Errors are logged by the worker and never requeued.
    async fn handle(&self, job: ProcessingJob) -> Result<()>;
}
