//! Wiring and output helpers for the `mediavault` binary.

use anyhow::{Context, Result};
use clap::ValueEnum;
use std::path::Path;
use std::sync::Arc;

use vault_core::models::MediaRecord;
use vault_core::{AppError, Config, LogLevel};
use vault_db::MediaStore;
use vault_processing::{
    FfmpegFrameEngine, FrameEngine, ImageProcessor, MediaDispatcher, OcrEngine, TesseractOcr,
    ThumbnailConfig, VideoFrameExtractor,
};
use vault_services::{IngestConfig, MediaLibrary};
use vault_worker::{job_queue, WorkerPool, WorkerPoolConfig};

/// A running pipeline: store, worker pool and the library facade in front of
/// them.
pub struct App {
    library: MediaLibrary,
    workers: WorkerPool,
}

impl App {
    /// Build the pipeline with tesseract and ffmpeg from the configuration.
    pub async fn build(config: &Config) -> Result<Self> {
        let timeout = config.external_tool_timeout();
        let ocr = TesseractOcr::new(&config.tesseract_path, &config.ocr_language, timeout)
            .context("Invalid TESSERACT_PATH")?;
        let frames = FfmpegFrameEngine::new(&config.ffmpeg_path, config.frame_quality, timeout)
            .context("Invalid FFMPEG_PATH")?;
        Self::build_with(config, Arc::new(ocr), Arc::new(frames)).await
    }

    /// Build the pipeline around the given OCR and frame extraction engines.
    pub async fn build_with(
        config: &Config,
        ocr: Arc<dyn OcrEngine>,
        frames: Arc<dyn FrameEngine>,
    ) -> Result<Self> {
        let pool = vault_db::connect(config)
            .await
            .context("Failed to open the media database")?;

        for dir in [&config.storage_dir, &config.thumbnail_dir, &config.frame_dir] {
            ensure_dir(dir).await?;
        }

        let store = MediaStore::new(pool);
        let images = Arc::new(ImageProcessor::new(
            store.clone(),
            ocr,
            ThumbnailConfig::new(&config.thumbnail_dir, config.thumbnail_width),
        ));
        let videos = Arc::new(VideoFrameExtractor::new(
            frames,
            images.clone(),
            &config.frame_dir,
        ));
        let dispatcher = Arc::new(MediaDispatcher::new(store.clone(), images, videos));

        let (queue, receiver) = job_queue(config.job_queue_size);
        let workers = WorkerPool::start(
            receiver,
            dispatcher,
            WorkerPoolConfig {
                workers: config.worker_count,
            },
        );
        let library = MediaLibrary::new(store, queue, IngestConfig::from(config));

        Ok(Self { library, workers })
    }

    pub fn library(&self) -> &MediaLibrary {
        &self.library
    }

    /// Close the queue and wait until every queued job has been processed.
    /// Clones of the library handed out earlier must be dropped first.
    pub async fn drain(self) {
        drop(self.library);
        self.workers.join().await;
    }

    /// Stop after the jobs currently running; queued jobs are abandoned.
    pub async fn shutdown(self) {
        self.workers.shutdown().await;
    }
}

async fn ensure_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create directory {}", dir.display()))
}

/// Log a failed library operation at the level its error asks for and return
/// the line shown to the user.
pub fn report_failure(action: &str, err: &AppError) -> String {
    let code = err.error_code();
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(error.code = code, error = %err, "{} failed", action),
        LogLevel::Warn => tracing::warn!(error.code = code, error = %err, "{} failed", action),
        LogLevel::Error => tracing::error!(error.code = code, error = %err, "{} failed", action),
    }

    let hint = if err.is_recoverable() {
        " (may succeed if retried)"
    } else {
        ""
    };
    format!("{} failed [{}]: {}{}", action, code, err, hint)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Truncate a string to `max_len` characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

pub fn format_records_table(records: &[MediaRecord]) -> String {
    if records.is_empty() {
        return "No media found.\n".to_string();
    }

    let mut out = format!(
        "{:<36} {:<24} {:<10} {:>9} {:<24} {:<19}\n",
        "ID", "Type", "Status", "Size (KB)", "Tags", "Created At"
    );
    out.push_str(&"-".repeat(127));
    out.push('\n');

    for record in records {
        out.push_str(&format!(
            "{:<36} {:<24} {:<10} {:>9.1} {:<24} {:<19}\n",
            record.id,
            truncate_string(&record.mime, 24),
            record.processing_status.as_str(),
            record.size_bytes as f64 / 1024.0,
            truncate_string(&record.tags, 24),
            record.created_at.format("%Y-%m-%d %H:%M:%S")
        ));
    }
    out.push_str(&format!("\n{} record(s)\n", records.len()));
    out
}

pub fn format_records(records: &[MediaRecord], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(format_records_table(records)),
        OutputFormat::Json => serde_json::to_string_pretty(records)
            .context("Failed to serialize records"),
    }
}
