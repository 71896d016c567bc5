use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use vault_core::models::{DerivedArtifacts, MediaRecord, ProcessingStatus};
use vault_core::AppError;

const MEDIA_COLUMNS: &str = "id, path, mime, size_bytes, tags, thumb, width, height, ocr_text, \
                             processing_status, created_at";

/// Row shape of the `media` table.
#[derive(Debug, sqlx::FromRow)]
struct MediaRow {
    id: String,
    path: String,
    mime: String,
    size_bytes: i64,
    tags: String,
    thumb: Option<String>,
    width: Option<i64>,
    height: Option<i64>,
    ocr_text: Option<String>,
    processing_status: String,
    created_at: DateTime<Utc>,
}

fn dimension(value: Option<i64>, column: &str, id: &str) -> Result<Option<u32>, AppError> {
    value
        .map(u32::try_from)
        .transpose()
        .map_err(|_| AppError::Internal(format!("Media {} has an invalid {} value", id, column)))
}

impl TryFrom<MediaRow> for MediaRecord {
    type Error = AppError;

    fn try_from(row: MediaRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| AppError::Internal(format!("Stored media id {} is invalid: {}", row.id, e)))?;
        let processing_status = row
            .processing_status
            .parse::<ProcessingStatus>()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let width = dimension(row.width, "width", &row.id)?;
        let height = dimension(row.height, "height", &row.id)?;

        Ok(MediaRecord {
            id,
            path: row.path,
            mime: row.mime,
            size_bytes: row.size_bytes,
            tags: row.tags,
            thumb: row.thumb,
            width,
            height,
            ocr_text: row.ocr_text,
            processing_status,
            created_at: row.created_at,
        })
    }
}

fn rows_to_records(rows: Vec<MediaRow>) -> Result<Vec<MediaRecord>, AppError> {
    rows.into_iter().map(MediaRecord::try_from).collect()
}

/// Primary record store.
///
/// Writes take a connection so that callers can place them inside a
/// transaction together with the matching search index write. Reads go
/// through the pool.
#[derive(Clone)]
pub struct MediaRepository {
    pool: SqlitePool,
}

impl MediaRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        conn: &mut SqliteConnection,
        record: &MediaRecord,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO media (id, path, mime, size_bytes, tags, thumb, width, height, ocr_text, \
             processing_status, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(record.id.to_string())
        .bind(&record.path)
        .bind(&record.mime)
        .bind(record.size_bytes)
        .bind(&record.tags)
        .bind(&record.thumb)
        .bind(record.width.map(i64::from))
        .bind(record.height.map(i64::from))
        .bind(&record.ocr_text)
        .bind(record.processing_status.as_str())
        .bind(record.created_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Store derived artifacts and mark the record completed.
    /// Returns false when no record has this id.
    pub async fn complete(
        &self,
        conn: &mut SqliteConnection,
        id: Uuid,
        artifacts: &DerivedArtifacts,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE media SET thumb = ?1, width = ?2, height = ?3, ocr_text = ?4, \
             processing_status = ?5 WHERE id = ?6",
        )
        .bind(&artifacts.thumb)
        .bind(i64::from(artifacts.width))
        .bind(i64::from(artifacts.height))
        .bind(&artifacts.ocr_text)
        .bind(ProcessingStatus::Completed.as_str())
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace the tags of a record; processing status is left untouched.
    /// Returns false when no record has this id.
    pub async fn update_tags(
        &self,
        conn: &mut SqliteConnection,
        id: Uuid,
        tags: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE media SET tags = ?1 WHERE id = ?2")
            .bind(tags)
            .bind(id.to_string())
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<MediaRecord>, AppError> {
        let row: Option<MediaRow> =
            sqlx::query_as(&format!("SELECT {} FROM media WHERE id = ?1", MEDIA_COLUMNS))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;
        row.map(MediaRecord::try_from).transpose()
    }

    /// All records, newest first.
    pub async fn list_recent(&self) -> Result<Vec<MediaRecord>, AppError> {
        let rows: Vec<MediaRow> = sqlx::query_as(&format!(
            "SELECT {} FROM media ORDER BY created_at DESC, rowid DESC",
            MEDIA_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows_to_records(rows)
    }

    /// Records for exactly the given ids, newest first. Unknown ids are skipped.
    pub async fn get_by_ids(&self, ids: &[Uuid]) -> Result<Vec<MediaRecord>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM media WHERE id IN (", MEDIA_COLUMNS));
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.to_string());
        }
        separated.push_unseparated(") ORDER BY created_at DESC, rowid DESC");

        let rows: Vec<MediaRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        rows_to_records(rows)
    }
}
