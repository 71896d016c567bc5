use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use super::search::SearchIndexEntry;

/// Lifecycle of a media record. A record starts in `Processing` and moves to
/// `Completed` once its derived artifacts are persisted. Failed jobs leave the
/// record in `Processing`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Processing,
    Completed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Completed => "completed",
        }
    }
}

impl Display for ProcessingStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProcessingStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "processing" => Ok(ProcessingStatus::Processing),
            "completed" => Ok(ProcessingStatus::Completed),
            _ => Err(anyhow::anyhow!("Invalid processing status: {}", s)),
        }
    }
}

/// One uploaded file and everything derived from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaRecord {
    pub id: Uuid,
    /// Storage location of the original bytes.
    pub path: String,
    pub mime: String,
    pub size_bytes: i64,
    pub tags: String,
    pub thumb: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub ocr_text: Option<String>,
    pub processing_status: ProcessingStatus,
    pub created_at: DateTime<Utc>,
}

impl MediaRecord {
    /// A freshly ingested record: status `processing`, no derived fields.
    pub fn new(
        id: Uuid,
        path: impl Into<String>,
        mime: impl Into<String>,
        size_bytes: i64,
        tags: impl Into<String>,
    ) -> Self {
        Self {
            id,
            path: path.into(),
            mime: mime.into(),
            size_bytes,
            tags: tags.into(),
            thumb: None,
            width: None,
            height: None,
            ocr_text: None,
            processing_status: ProcessingStatus::Processing,
            created_at: Utc::now(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.processing_status == ProcessingStatus::Completed
    }

    /// Projection of this record into the search index.
    pub fn index_entry(&self) -> SearchIndexEntry {
        SearchIndexEntry {
            id: self.id,
            ocr_text: self.ocr_text.clone().unwrap_or_default(),
            tags: self.tags.clone(),
            path: self.path.clone(),
        }
    }
}

/// Fields written by the pipeline when processing of a record succeeds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DerivedArtifacts {
    pub thumb: String,
    pub width: u32,
    pub height: u32,
    pub ocr_text: String,
}
