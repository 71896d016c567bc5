pub mod job;
pub mod media;
pub mod search;

pub use job::ProcessingJob;
pub use media::{DerivedArtifacts, MediaRecord, ProcessingStatus};
pub use search::SearchIndexEntry;
