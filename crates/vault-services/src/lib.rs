//! MediaVault Services Layer
//!
//! The operations the front end calls: ingesting files, editing tags, looking
//! records up and searching. [`MediaLibrary`] is the single facade over the
//! store, the job queue and the query engine.

pub mod ingest;
pub mod library;
pub mod query;

pub use ingest::{guess_mime, staged_path, IngestConfig, IngestRequest};
pub use library::MediaLibrary;
pub use query::{MediaCatalog, QueryEngine};
