//! Record store and search index written together.
//!
//! Each write opens one transaction. The record write must succeed for the
//! transaction to commit. The index write runs inside a savepoint: when it
//! fails the savepoint is rolled back, the failure is logged, and the record
//! write still commits. Callers learn about the gap through [`IndexSync`].

use sqlx::{Acquire, SqliteConnection, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

use vault_core::models::{DerivedArtifacts, MediaRecord, SearchIndexEntry};
use vault_core::AppError;

use crate::index::{FtsIndex, SearchIndex};
use crate::repository::MediaRepository;

/// Outcome of the index half of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSync {
    Synced,
    /// The record was written but its index entry was not updated.
    Diverged,
}

impl IndexSync {
    pub fn is_synced(self) -> bool {
        matches!(self, IndexSync::Synced)
    }
}

enum IndexWrite<'a> {
    Insert(&'a SearchIndexEntry),
    OcrText(&'a str),
    Tags(&'a str),
}

impl IndexWrite<'_> {
    fn kind(&self) -> &'static str {
        match self {
            IndexWrite::Insert(_) => "insert",
            IndexWrite::OcrText(_) => "ocr_text",
            IndexWrite::Tags(_) => "tags",
        }
    }
}

#[derive(Clone)]
pub struct MediaStore {
    pool: SqlitePool,
    records: MediaRepository,
    index: Arc<dyn SearchIndex>,
}

impl MediaStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_index(pool, Arc::new(FtsIndex))
    }

    pub fn with_index(pool: SqlitePool, index: Arc<dyn SearchIndex>) -> Self {
        Self {
            records: MediaRepository::new(pool.clone()),
            pool,
            index,
        }
    }

    /// Insert a new record and its index entry.
    #[tracing::instrument(skip(self, record), fields(media.id = %record.id))]
    pub async fn create(&self, record: &MediaRecord) -> Result<IndexSync, AppError> {
        let entry = record.index_entry();
        let mut tx = self.pool.begin().await?;
        self.records.insert(&mut tx, record).await?;
        let sync = self
            .sync_index(&mut tx, record.id, IndexWrite::Insert(&entry))
            .await?;
        tx.commit().await?;
        Ok(sync)
    }

    /// Persist derived artifacts, mark the record completed and refresh the
    /// OCR text in the index.
    #[tracing::instrument(skip(self, artifacts), fields(media.id = %id))]
    pub async fn complete(
        &self,
        id: Uuid,
        artifacts: &DerivedArtifacts,
    ) -> Result<IndexSync, AppError> {
        let mut tx = self.pool.begin().await?;
        if !self.records.complete(&mut tx, id, artifacts).await? {
            return Err(AppError::NotFound(format!("Media {} not found", id)));
        }
        let sync = self
            .sync_index(&mut tx, id, IndexWrite::OcrText(&artifacts.ocr_text))
            .await?;
        tx.commit().await?;
        Ok(sync)
    }

    #[tracing::instrument(skip(self, tags), fields(media.id = %id))]
    pub async fn update_tags(&self, id: Uuid, tags: &str) -> Result<IndexSync, AppError> {
        let mut tx = self.pool.begin().await?;
        if !self.records.update_tags(&mut tx, id, tags).await? {
            return Err(AppError::NotFound(format!("Media {} not found", id)));
        }
        let sync = self.sync_index(&mut tx, id, IndexWrite::Tags(tags)).await?;
        tx.commit().await?;
        Ok(sync)
    }

    async fn sync_index(
        &self,
        conn: &mut SqliteConnection,
        id: Uuid,
        write: IndexWrite<'_>,
    ) -> Result<IndexSync, AppError> {
        let mut savepoint = (&mut *conn).begin().await?;
        let result = match &write {
            IndexWrite::Insert(entry) => self.index.insert_entry(&mut savepoint, entry).await,
            IndexWrite::OcrText(text) => self.index.update_ocr_text(&mut savepoint, id, text).await,
            IndexWrite::Tags(tags) => self.index.update_tags(&mut savepoint, id, tags).await,
        };

        match result {
            Ok(()) => {
                savepoint.commit().await?;
                Ok(IndexSync::Synced)
            }
            Err(e) => {
                savepoint.rollback().await?;
                tracing::warn!(
                    error = %e,
                    media.id = %id,
                    index.write = write.kind(),
                    "Search index write failed; record and index have diverged"
                );
                Ok(IndexSync::Diverged)
            }
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<MediaRecord>, AppError> {
        self.records.get_by_id(id).await
    }

    pub async fn list_recent(&self) -> Result<Vec<MediaRecord>, AppError> {
        self.records.list_recent().await
    }

    pub async fn get_by_ids(&self, ids: &[Uuid]) -> Result<Vec<MediaRecord>, AppError> {
        self.records.get_by_ids(ids).await
    }

    pub async fn matching_ids(&self, query: &str) -> Result<Vec<Uuid>, AppError> {
        let mut conn = self.pool.acquire().await?;
        self.index.matching_ids(&mut conn, query).await
    }

    pub async fn index_entry(&self, id: Uuid) -> Result<Option<SearchIndexEntry>, AppError> {
        let mut conn = self.pool.acquire().await?;
        self.index.entry(&mut conn, id).await
    }
}
