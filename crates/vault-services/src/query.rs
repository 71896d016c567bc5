//! Query engine
//!
//! An empty query lists every record, newest first, without touching the
//! search index. Any other string, whitespace included, goes to the index. A non-empty query is resolved to ids through the index and
//! only then are the records fetched; when nothing matches the record store
//! is never queried.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use vault_core::models::MediaRecord;
use vault_core::AppError;
use vault_db::MediaStore;

/// The reads the query engine needs from storage.
#[async_trait]
pub trait MediaCatalog: Send + Sync {
    async fn matching_ids(&self, query: &str) -> Result<Vec<Uuid>, AppError>;

    /// All records ordered by `created_at` descending.
    async fn list_recent(&self) -> Result<Vec<MediaRecord>, AppError>;

    /// Exactly the given records ordered by `created_at` descending.
    async fn fetch_by_ids(&self, ids: &[Uuid]) -> Result<Vec<MediaRecord>, AppError>;
}

#[async_trait]
impl MediaCatalog for MediaStore {
    async fn matching_ids(&self, query: &str) -> Result<Vec<Uuid>, AppError> {
        MediaStore::matching_ids(self, query).await
    }

    async fn list_recent(&self) -> Result<Vec<MediaRecord>, AppError> {
        MediaStore::list_recent(self).await
    }

    async fn fetch_by_ids(&self, ids: &[Uuid]) -> Result<Vec<MediaRecord>, AppError> {
        self.get_by_ids(ids).await
    }
}

#[derive(Clone)]
pub struct QueryEngine {
    catalog: Arc<dyn MediaCatalog>,
}

impl QueryEngine {
    pub fn new(catalog: Arc<dyn MediaCatalog>) -> Self {
        Self { catalog }
    }

    #[tracing::instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<MediaRecord>, AppError> {
        if query.is_empty() {
            return self.catalog.list_recent().await;
        }

        let ids = self.catalog.matching_ids(query).await?;
        if ids.is_empty() {
            tracing::debug!("No index matches");
            return Ok(Vec::new());
        }

        let records = self.catalog.fetch_by_ids(&ids).await?;
        tracing::debug!(matches = ids.len(), records = records.len(), "Search complete");
        Ok(records)
    }
}
