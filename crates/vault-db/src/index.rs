//! Full-text search index over the text fields of media records.

use async_trait::async_trait;
use sqlx::SqliteConnection;
use std::collections::HashSet;
use uuid::Uuid;

use vault_core::models::SearchIndexEntry;
use vault_core::AppError;

/// Text index kept alongside the record store.
///
/// Every method takes a connection so the write can join the transaction that
/// carries the corresponding record write.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn insert_entry(
        &self,
        conn: &mut SqliteConnection,
        entry: &SearchIndexEntry,
    ) -> Result<(), AppError>;

    async fn update_ocr_text(
        &self,
        conn: &mut SqliteConnection,
        id: Uuid,
        ocr_text: &str,
    ) -> Result<(), AppError>;

    async fn update_tags(
        &self,
        conn: &mut SqliteConnection,
        id: Uuid,
        tags: &str,
    ) -> Result<(), AppError>;

    /// Ids of entries matching `query` in the index's native query language.
    async fn matching_ids(
        &self,
        conn: &mut SqliteConnection,
        query: &str,
    ) -> Result<Vec<Uuid>, AppError>;

    async fn entry(
        &self,
        conn: &mut SqliteConnection,
        id: Uuid,
    ) -> Result<Option<SearchIndexEntry>, AppError>;
}

/// SQLite FTS5 implementation backed by the `media_fts` virtual table.
#[derive(Debug, Clone, Copy, Default)]
pub struct FtsIndex;

fn entry_missing(id: Uuid) -> AppError {
    AppError::NotFound(format!("Search index entry for media {}", id))
}

/// FTS5 reports malformed MATCH expressions as generic database errors.
fn classify_match_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        let message = db_err.message();
        if message.contains("fts5")
            || message.contains("syntax error")
            || message.contains("unterminated string")
            || message.starts_with("no such column")
        {
            return AppError::InvalidInput(format!("Invalid search query: {}", message));
        }
    }
    AppError::Database(err)
}

#[async_trait]
impl SearchIndex for FtsIndex {
    async fn insert_entry(
        &self,
        conn: &mut SqliteConnection,
        entry: &SearchIndexEntry,
    ) -> Result<(), AppError> {
        sqlx::query("INSERT INTO media_fts (ocr_text, tags, path, id) VALUES (?1, ?2, ?3, ?4)")
            .bind(&entry.ocr_text)
            .bind(&entry.tags)
            .bind(&entry.path)
            .bind(entry.id.to_string())
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn update_ocr_text(
        &self,
        conn: &mut SqliteConnection,
        id: Uuid,
        ocr_text: &str,
    ) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE media_fts SET ocr_text = ?1 WHERE id = ?2")
            .bind(ocr_text)
            .bind(id.to_string())
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(entry_missing(id));
        }
        Ok(())
    }

    async fn update_tags(
        &self,
        conn: &mut SqliteConnection,
        id: Uuid,
        tags: &str,
    ) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE media_fts SET tags = ?1 WHERE id = ?2")
            .bind(tags)
            .bind(id.to_string())
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(entry_missing(id));
        }
        Ok(())
    }

    async fn matching_ids(
        &self,
        conn: &mut SqliteConnection,
        query: &str,
    ) -> Result<Vec<Uuid>, AppError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT id FROM media_fts WHERE media_fts MATCH ?1")
                .bind(query)
                .fetch_all(&mut *conn)
                .await
                .map_err(classify_match_error)?;

        let mut ids = Vec::with_capacity(rows.len());
        let mut seen = HashSet::with_capacity(rows.len());
        for (raw,) in rows {
            let id = Uuid::parse_str(&raw).map_err(|e| {
                AppError::Internal(format!("Search index holds invalid id {}: {}", raw, e))
            })?;
            if seen.insert(id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    async fn entry(
        &self,
        conn: &mut SqliteConnection,
        id: Uuid,
    ) -> Result<Option<SearchIndexEntry>, AppError> {
        let row: Option<(String, String, String)> =
            sqlx::query_as("SELECT ocr_text, tags, path FROM media_fts WHERE id = ?1")
                .bind(id.to_string())
                .fetch_optional(&mut *conn)
                .await?;
        Ok(row.map(|(ocr_text, tags, path)| SearchIndexEntry {
            id,
            ocr_text,
            tags,
            path,
        }))
    }
}
