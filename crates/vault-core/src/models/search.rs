use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Text projection of a media record held by the full-text index.
///
/// `path` is stored alongside the entry but does not take part in matching.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchIndexEntry {
    pub id: Uuid,
    pub ocr_text: String,
    pub tags: String,
    pub path: String,
}
