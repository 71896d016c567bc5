use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

use vault_core::models::ProcessingStatus;
use vault_core::AppError;
use vault_db::test_helpers::TestDatabase;
use vault_db::MediaStore;
use vault_services::{IngestConfig, IngestRequest, MediaLibrary};
use vault_worker::{job_queue, JobReceiver};

struct Fixture {
    db: TestDatabase,
    dir: TempDir,
    library: MediaLibrary,
    receiver: JobReceiver,
}

impl Fixture {
    async fn new(queue_capacity: usize, max_file_size_bytes: u64) -> Self {
        let db = TestDatabase::new().await;
        let dir = TempDir::new().unwrap();
        let (queue, receiver) = job_queue(queue_capacity);
        let library = MediaLibrary::new(
            MediaStore::new(db.pool.clone()),
            queue,
            IngestConfig {
                storage_dir: dir.path().join("storage"),
                max_file_size_bytes,
            },
        );
        Self {
            db,
            dir,
            library,
            receiver,
        }
    }

    fn upload(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let uploads = self.dir.path().join("uploads");
        std::fs::create_dir_all(&uploads).unwrap();
        let path = uploads.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn stored_files(&self) -> usize {
        std::fs::read_dir(self.dir.path().join("storage"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

#[tokio::test]
async fn test_ingest_stages_file_creates_record_and_enqueues_job() {
    let fx = Fixture::new(4, 1024).await;
    let source = fx.upload("Sunset.PNG", b"fake png bytes");

    let record = fx
        .library
        .ingest(IngestRequest::new(&source).with_tags("  beach holiday "))
        .await
        .unwrap();

    assert_eq!(record.mime, "image/png");
    assert_eq!(record.tags, "  beach holiday ");
    assert_eq!(record.size_bytes, 14);
    assert_eq!(record.processing_status, ProcessingStatus::Processing);
    assert!(record.path.ends_with(&format!("{}.png", record.id)));
    assert_eq!(std::fs::read(&record.path).unwrap(), b"fake png bytes");

    let job = fx.receiver.dequeue().await.unwrap();
    assert_eq!(job.id, record.id);
    assert_eq!(job.mime_type, "image/png");
    assert_eq!(job.path, PathBuf::from(&record.path));

    let stored = fx.library.get(record.id).await.unwrap();
    assert_eq!(stored.path, record.path);
    assert_eq!(stored.tags, record.tags);
    let found = fx.library.search("holiday").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, record.id);
}

#[tokio::test]
async fn test_ingest_unknown_extension_falls_back_to_octet_stream() {
    let fx = Fixture::new(4, 1024).await;
    let source = fx.upload("blob", b"0123");

    let record = fx.library.ingest(IngestRequest::new(&source)).await.unwrap();

    assert_eq!(record.mime, "application/octet-stream");
    assert!(record.path.ends_with(&record.id.to_string()));
}

#[tokio::test]
async fn test_rejected_upload_leaves_no_trace() {
    let fx = Fixture::new(4, 8).await;
    let too_large = fx.upload("big.png", &[7u8; 9]);
    let empty = fx.upload("empty.png", b"");

    let result = fx.library.ingest(IngestRequest::new(&too_large)).await;
    assert!(matches!(result, Err(AppError::PayloadTooLarge(_))));
    let result = fx.library.ingest(IngestRequest::new(&empty)).await;
    assert!(matches!(result, Err(AppError::InvalidInput(_))));

    assert!(fx.library.search("").await.unwrap().is_empty());
    assert_eq!(fx.stored_files(), 0);
    assert!(tokio::time::timeout(Duration::from_millis(50), fx.receiver.dequeue())
        .await
        .is_err());
}

#[tokio::test]
async fn test_failed_record_creation_removes_staged_file() {
    let fx = Fixture::new(4, 1024).await;
    let source = fx.upload("photo.jpg", b"jpeg");
    sqlx::query("DROP TABLE media")
        .execute(&fx.db.pool)
        .await
        .unwrap();

    let result = fx.library.ingest(IngestRequest::new(&source)).await;

    assert!(matches!(result, Err(AppError::Database(_))));
    assert_eq!(fx.stored_files(), 0);
}

#[tokio::test]
async fn test_update_tags_and_lookup() {
    let fx = Fixture::new(4, 1024).await;
    let source = fx.upload("scan.png", b"png");
    let record = fx
        .library
        .ingest(IngestRequest::new(&source).with_tags("draft"))
        .await
        .unwrap();

    let updated = fx
        .library
        .update_tags(record.id, " final invoice\n")
        .await
        .unwrap();
    assert_eq!(updated.tags, " final invoice\n");
    assert_eq!(updated.processing_status, ProcessingStatus::Processing);

    assert!(fx.library.search("draft").await.unwrap().is_empty());
    assert_eq!(fx.library.search("invoice").await.unwrap()[0].id, record.id);

    let missing = Uuid::new_v4();
    assert!(matches!(
        fx.library.update_tags(missing, "x").await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        fx.library.get(missing).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_ingest_waits_while_queue_is_full() {
    let fx = Fixture::new(1, 1024).await;
    let first = fx.upload("one.png", b"1");
    let second = fx.upload("two.png", b"2");
    fx.library.ingest(IngestRequest::new(&first)).await.unwrap();

    let pending = {
        let library = fx.library.clone();
        let second = second.clone();
        tokio::spawn(async move { library.ingest(IngestRequest::new(second)).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!pending.is_finished(), "ingest should wait for a free slot");

    fx.receiver.dequeue().await.unwrap();
    let record = tokio::time::timeout(Duration::from_secs(5), pending)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(fx.receiver.dequeue().await.unwrap().id, record.id);
}
