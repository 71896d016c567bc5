use image::{GenericImageView, Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

use vault_core::models::{MediaRecord, ProcessingJob, ProcessingStatus};
use vault_db::test_helpers::TestDatabase;
use vault_db::MediaStore;
use vault_processing::test_helpers::{FakeFrame, FakeFrameEngine, StaticOcr};
use vault_processing::{
    CommandError, ExternalCommand, ImageProcessor, MediaDispatcher, ThumbnailConfig,
    VideoFrameExtractor,
};
use vault_worker::JobHandler;

struct Harness {
    _db: TestDatabase,
    dir: TempDir,
    store: MediaStore,
    ocr: Arc<StaticOcr>,
    frames: Arc<FakeFrameEngine>,
    extractor: Arc<VideoFrameExtractor>,
    dispatcher: MediaDispatcher,
}

impl Harness {
    async fn new(ocr_text: &str, frame: FakeFrame) -> Self {
        let db = TestDatabase::new().await;
        let dir = TempDir::new().unwrap();
        let store = MediaStore::new(db.pool.clone());
        let ocr = Arc::new(StaticOcr::new(ocr_text));
        let frames = Arc::new(FakeFrameEngine::new(frame));

        let images = Arc::new(ImageProcessor::new(
            store.clone(),
            ocr.clone(),
            ThumbnailConfig::new(dir.path().join("thumbs"), 200),
        ));
        let extractor = Arc::new(VideoFrameExtractor::new(
            frames.clone(),
            images.clone(),
            dir.path().join("frames"),
        ));
        let dispatcher = MediaDispatcher::new(store.clone(), images, extractor.clone());

        Self {
            _db: db,
            dir,
            store,
            ocr,
            frames,
            extractor,
            dispatcher,
        }
    }

    fn storage_path(&self, name: &str) -> PathBuf {
        let storage = self.dir.path().join("storage");
        std::fs::create_dir_all(&storage).unwrap();
        storage.join(name)
    }

    /// Register a record for a file that already exists at `path`.
    async fn register(&self, path: &Path, mime: &str) -> ProcessingJob {
        let id = Uuid::new_v4();
        let size = std::fs::metadata(path).map(|m| m.len() as i64).unwrap_or(0);
        let record = MediaRecord::new(id, path.to_string_lossy(), mime, size, "");
        self.store.create(&record).await.unwrap();
        ProcessingJob::from(&record)
    }

    async fn image_job(&self, width: u32, height: u32) -> ProcessingJob {
        let path = self.storage_path(&format!("{}.png", Uuid::new_v4()));
        RgbaImage::from_pixel(width, height, Rgba([200, 30, 30, 255]))
            .save(&path)
            .unwrap();
        self.register(&path, "image/png").await
    }

    async fn video_job(&self, mime: &str) -> ProcessingJob {
        let path = self.storage_path(&format!("{}.mp4", Uuid::new_v4()));
        std::fs::write(&path, b"not really a video").unwrap();
        self.register(&path, mime).await
    }

    async fn record(&self, id: Uuid) -> MediaRecord {
        self.store.get(id).await.unwrap().unwrap()
    }

    fn files_in(&self, subdir: &str) -> Vec<PathBuf> {
        match std::fs::read_dir(self.dir.path().join(subdir)) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

#[tokio::test]
async fn test_image_job_produces_thumbnail_and_completes() {
    let harness = Harness::new("hello world", FakeFrame::Fail).await;
    let job = harness.image_job(300, 200).await;

    harness.dispatcher.handle(job.clone()).await.unwrap();

    let record = harness.record(job.id).await;
    assert_eq!(record.processing_status, ProcessingStatus::Completed);
    assert_eq!(record.width, Some(300));
    assert_eq!(record.height, Some(200));
    assert_eq!(record.ocr_text.as_deref(), Some("hello world"));

    let thumb = record.thumb.expect("thumbnail path stored");
    assert!(thumb.ends_with(&format!("{}_thumb.jpg", job.id)));
    let thumbnail = image::open(&thumb).unwrap();
    assert_eq!(thumbnail.dimensions(), (200, 133));

    assert_eq!(harness.ocr.calls(), vec![job.path.clone()]);
    assert_eq!(harness.store.matching_ids("hello").await.unwrap(), vec![job.id]);
}

#[tokio::test]
async fn test_video_job_processes_first_frame_under_video_id() {
    let harness = Harness::new("", FakeFrame::Solid { width: 640, height: 360 }).await;
    let job = harness.video_job("video/mp4").await;
    let frame_path = harness.extractor.frame_path(job.id);

    harness.dispatcher.handle(job.clone()).await.unwrap();

    let record = harness.record(job.id).await;
    assert!(record.is_completed());
    assert_eq!((record.width, record.height), (Some(640), Some(360)));
    assert_eq!(record.ocr_text.as_deref(), Some(""));
    let thumbnail = image::open(record.thumb.unwrap()).unwrap();
    assert_eq!(thumbnail.dimensions(), (200, 113));

    assert_eq!(harness.frames.inputs(), vec![job.path.clone()]);
    assert_eq!(harness.ocr.calls(), vec![frame_path.clone()]);
    assert!(!frame_path.exists(), "temporary frame must be removed");
    assert!(harness.files_in("frames").is_empty());
}

#[tokio::test]
async fn test_gif_is_routed_through_frame_extraction() {
    let harness = Harness::new("", FakeFrame::Solid { width: 50, height: 50 }).await;
    let job = harness.video_job("image/gif").await;

    harness.dispatcher.handle(job.clone()).await.unwrap();

    assert_eq!(harness.frames.inputs(), vec![job.path.clone()]);
    assert!(harness.record(job.id).await.is_completed());
    assert!(!harness.extractor.frame_path(job.id).exists());
}

#[tokio::test]
async fn test_failed_extraction_removes_partial_frame_and_keeps_processing() {
    let harness = Harness::new("", FakeFrame::PartialThenFail).await;
    let job = harness.video_job("video/webm").await;

    let result = harness.dispatcher.handle(job.clone()).await;
    assert!(result.is_err());

    assert!(!harness.extractor.frame_path(job.id).exists());
    let record = harness.record(job.id).await;
    assert_eq!(record.processing_status, ProcessingStatus::Processing);
    assert!(record.thumb.is_none());
    assert!(harness.ocr.calls().is_empty());
}

#[tokio::test]
async fn test_frame_removed_when_image_processing_fails() {
    let harness = Harness::new("text", FakeFrame::Undecodable).await;
    let job = harness.video_job("video/mp4").await;

    assert!(harness.dispatcher.handle(job.clone()).await.is_err());

    assert_eq!(harness.frames.inputs(), vec![job.path.clone()]);
    assert!(!harness.extractor.frame_path(job.id).exists());
    assert!(harness.files_in("frames").is_empty());
    let record = harness.record(job.id).await;
    assert_eq!(record.processing_status, ProcessingStatus::Processing);
    assert!(record.thumb.is_none());
    assert!(harness.ocr.calls().is_empty());
}

#[tokio::test]
async fn test_undecodable_image_leaves_record_processing() {
    let harness = Harness::new("text", FakeFrame::Fail).await;
    let path = harness.storage_path("broken.png");
    std::fs::write(&path, b"garbage bytes").unwrap();
    let job = harness.register(&path, "image/png").await;

    assert!(harness.dispatcher.handle(job.clone()).await.is_err());

    let record = harness.record(job.id).await;
    assert_eq!(record.processing_status, ProcessingStatus::Processing);
    assert!(harness.files_in("thumbs").is_empty());
    assert!(harness.ocr.calls().is_empty());
}

#[tokio::test]
async fn test_unsupported_mime_is_dropped() {
    let harness = Harness::new("text", FakeFrame::Fail).await;
    let path = harness.storage_path("report.pdf");
    std::fs::write(&path, b"%PDF-1.4").unwrap();
    let job = harness.register(&path, "application/pdf").await;

    harness.dispatcher.handle(job.clone()).await.unwrap();

    let record = harness.record(job.id).await;
    assert_eq!(record.processing_status, ProcessingStatus::Processing);
    assert!(harness.ocr.calls().is_empty());
    assert!(harness.frames.inputs().is_empty());
}

#[tokio::test]
async fn test_replayed_job_is_idempotent() {
    let harness = Harness::new("receipt", FakeFrame::Fail).await;
    let job = harness.image_job(120, 80).await;

    harness.dispatcher.handle(job.clone()).await.unwrap();
    let first = harness.record(job.id).await;
    harness.dispatcher.handle(job.clone()).await.unwrap();
    let second = harness.record(job.id).await;

    assert_eq!(first, second);
    assert_eq!(harness.ocr.calls().len(), 1);
    assert_eq!(harness.files_in("thumbs").len(), 1);
}

#[tokio::test]
async fn test_concurrent_duplicate_jobs_process_once() {
    let harness = Harness::new("once", FakeFrame::Fail).await;
    let job = harness.image_job(64, 64).await;

    let (a, b) = tokio::join!(
        harness.dispatcher.handle(job.clone()),
        harness.dispatcher.handle(job.clone())
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(harness.ocr.calls().len(), 1);
    assert!(harness.record(job.id).await.is_completed());
}

#[tokio::test]
async fn test_job_for_missing_record_is_skipped() {
    let harness = Harness::new("text", FakeFrame::Fail).await;
    let path = harness.storage_path("orphan.png");
    RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]))
        .save(&path)
        .unwrap();
    let job = ProcessingJob::new(Uuid::new_v4(), &path, "image/png");

    harness.dispatcher.handle(job).await.unwrap();

    assert!(harness.files_in("thumbs").is_empty());
    assert!(harness.ocr.calls().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_external_command_is_killed_after_timeout() {
    let command = ExternalCommand::new("sleep", Duration::from_millis(200)).unwrap();
    let started = std::time::Instant::now();

    let result = command.run(["5"]).await;

    assert!(matches!(result, Err(CommandError::Timeout { .. })));
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[cfg(unix)]
#[tokio::test]
async fn test_external_command_non_zero_exit_is_failed() {
    let command = ExternalCommand::new("sh", Duration::from_secs(5)).unwrap();

    let result = command.run(["-c", "echo boom >&2; exit 3"]).await;

    match result {
        Err(CommandError::Failed { stderr, status, .. }) => {
            assert_eq!(stderr, "boom");
            assert_eq!(status.code(), Some(3));
        }
        other => panic!("expected Failed, got {:?}", other),
    }
}
