use std::sync::Arc;
use uuid::Uuid;

use vault_core::models::{MediaRecord, ProcessingJob};
use vault_core::AppError;
use vault_db::{IndexSync, MediaStore};
use vault_worker::JobQueue;

use crate::ingest::{guess_mime, stage_upload, staged_path, validate_upload};
use crate::ingest::{IngestConfig, IngestRequest};
use crate::query::QueryEngine;

/// Entry point for every user-facing media operation.
#[derive(Clone)]
pub struct MediaLibrary {
    store: MediaStore,
    queue: JobQueue,
    query: QueryEngine,
    config: IngestConfig,
}

impl MediaLibrary {
    pub fn new(store: MediaStore, queue: JobQueue, config: IngestConfig) -> Self {
        let query = QueryEngine::new(Arc::new(store.clone()));
        Self {
            store,
            queue,
            query,
            config,
        }
    }

    pub fn store(&self) -> &MediaStore {
        &self.store
    }

    /// Validate and stage a file, create its record (status `processing`)
    /// and queue it for processing. Waits while the job queue is full.
    #[tracing::instrument(skip(self, request), fields(source = %request.source.display()))]
    pub async fn ingest(&self, request: IngestRequest) -> Result<MediaRecord, AppError> {
        let size = validate_upload(&request.source, self.config.max_file_size_bytes).await?;
        let file_name = request.file_name()?;

        let id = Uuid::new_v4();
        let mime = guess_mime(&file_name);
        let dest = staged_path(&self.config.storage_dir, id, &file_name);
        stage_upload(&request.source, &dest).await?;

        let record = MediaRecord::new(
            id,
            dest.to_string_lossy(),
            mime,
            size as i64,
            request.tags.as_str(),
        );

        match self.store.create(&record).await {
            Ok(IndexSync::Synced) => {}
            Ok(IndexSync::Diverged) => {
                tracing::warn!(media.id = %id, "Record created without a search index entry");
            }
            Err(e) => {
                if let Err(remove_err) = tokio::fs::remove_file(&dest).await {
                    tracing::warn!(
                        error = %remove_err,
                        path = %dest.display(),
                        "Failed to remove staged file after record creation failed"
                    );
                }
                return Err(e);
            }
        }

        self.queue
            .enqueue(ProcessingJob::from(&record))
            .await
            .map_err(|e| AppError::Internal(format!("Failed to queue media {}: {}", id, e)))?;

        tracing::info!(
            media.id = %id,
            mime = %record.mime,
            size_bytes = size,
            "Media ingested"
        );
        Ok(record)
    }

    /// Replace the tags of a record verbatim. Processing status is untouched.
    pub async fn update_tags(&self, id: Uuid, tags: &str) -> Result<MediaRecord, AppError> {
        let sync = self.store.update_tags(id, tags).await?;
        if !sync.is_synced() {
            tracing::warn!(media.id = %id, "Tags saved but the search index was not updated");
        }
        self.get(id).await
    }

    pub async fn get(&self, id: Uuid) -> Result<MediaRecord, AppError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Media {} not found", id)))
    }

    pub async fn search(&self, query: &str) -> Result<Vec<MediaRecord>, AppError> {
        self.query.search(query).await
    }
}
