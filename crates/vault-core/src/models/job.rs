use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use super::media::MediaRecord;

/// Ephemeral unit of pipeline work. Created at ingestion, consumed once by a
/// worker, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessingJob {
    pub id: Uuid,
    pub path: PathBuf,
    pub mime_type: String,
}

impl ProcessingJob {
    pub fn new(id: Uuid, path: impl Into<PathBuf>, mime_type: impl Into<String>) -> Self {
        Self {
            id,
            path: path.into(),
            mime_type: mime_type.into(),
        }
    }
}

impl From<&MediaRecord> for ProcessingJob {
    fn from(record: &MediaRecord) -> Self {
        Self::new(record.id, &record.path, &record.mime)
    }
}
