//! Background job infrastructure for MediaVault: a bounded in-memory job
//! queue and the fixed pool of workers that drains it.

pub mod context;
pub mod pool;
pub mod queue;

pub use context::JobHandler;
pub use pool::{WorkerPool, WorkerPoolConfig};
pub use queue::{job_queue, JobQueue, JobReceiver, QueueError};
