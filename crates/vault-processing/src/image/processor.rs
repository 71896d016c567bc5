//! Image processor - thumbnail, dimensions and OCR for one media record

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageError, ImageReader};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use vault_core::models::DerivedArtifacts;
use vault_db::MediaStore;

use crate::error::ProcessingError;
use crate::ocr::OcrEngine;

const THUMBNAIL_JPEG_QUALITY: u8 = 95;

/// Largest thumbnail, in pixels, the resizer may be asked for. Lanczos3 works
/// on 16-byte Rgba32F pixels, so this keeps its buffers within the decoder's
/// default 512 MiB allocation limit.
pub const MAX_THUMBNAIL_PIXELS: u64 = 512 * 1024 * 1024 / 16;

/// Where thumbnails go and how wide they are.
#[derive(Debug, Clone)]
pub struct ThumbnailConfig {
    pub dir: PathBuf,
    pub width: u32,
}

impl ThumbnailConfig {
    pub fn new(dir: impl Into<PathBuf>, width: u32) -> Self {
        Self {
            dir: dir.into(),
            width: width.max(1),
        }
    }

    /// `<dir>/<id>_thumb.jpg`
    pub fn thumb_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}_thumb.jpg", id))
    }
}

/// Thumbnail size for an original of `width`×`height` scaled to
/// `target_width`, keeping the aspect ratio. Height never drops below 1.
pub fn thumbnail_dimensions(width: u32, height: u32, target_width: u32) -> (u32, u32) {
    let target_width = target_width.max(1);
    if width == 0 {
        return (target_width, 1);
    }
    let aspect_ratio = height as f64 / width as f64;
    let target_height = (target_width as f64 * aspect_ratio).round() as u32;
    (target_width, target_height.max(1))
}

/// Decode `source`, write a Lanczos3 JPEG thumbnail to `dest` and return the
/// pixel dimensions of the original. Blocking; run it off the async runtime.
pub fn render_thumbnail(
    source: &Path,
    dest: &Path,
    target_width: u32,
) -> Result<(u32, u32), ProcessingError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| ProcessingError::Io { path, source }
    };

    let img = ImageReader::open(source)
        .map_err(io_err(source))?
        .with_guessed_format()
        .map_err(io_err(source))?
        .decode()
        .map_err(|e| ProcessingError::Decode {
            path: source.to_path_buf(),
            source: e,
        })?;

    let (width, height) = img.dimensions();
    let (thumb_width, thumb_height) = thumbnail_dimensions(width, height, target_width);
    if thumb_width as u64 * thumb_height as u64 > MAX_THUMBNAIL_PIXELS {
        return Err(ProcessingError::ThumbnailTooLarge {
            path: source.to_path_buf(),
            width: thumb_width,
            height: thumb_height,
        });
    }
    let thumbnail = img.resize_exact(thumb_width, thumb_height, FilterType::Lanczos3);

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(io_err(parent))?;
    }

    let save_err = |e: ImageError| ProcessingError::ThumbnailSave {
        path: dest.to_path_buf(),
        source: e,
    };
    let file = File::create(dest).map_err(|e| save_err(ImageError::IoError(e)))?;
    let mut writer = BufWriter::new(file);
    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(thumbnail.to_rgb8());
    rgb.write_with_encoder(JpegEncoder::new_with_quality(
        &mut writer,
        THUMBNAIL_JPEG_QUALITY,
    ))
    .map_err(save_err)?;
    writer
        .flush()
        .map_err(|e| save_err(ImageError::IoError(e)))?;

    Ok((width, height))
}

pub struct ImageProcessor {
    store: MediaStore,
    ocr: Arc<dyn OcrEngine>,
    thumbnails: ThumbnailConfig,
}

impl ImageProcessor {
    pub fn new(store: MediaStore, ocr: Arc<dyn OcrEngine>, thumbnails: ThumbnailConfig) -> Self {
        Self {
            store,
            ocr,
            thumbnails,
        }
    }

    /// Derive thumbnail, dimensions and OCR text from the image at `path` and
    /// store them on record `id`, marking it completed.
    #[tracing::instrument(skip(self, path), fields(media.id = %id, path = %path.display()))]
    pub async fn process(&self, id: Uuid, path: &Path) -> Result<DerivedArtifacts, ProcessingError> {
        let started = std::time::Instant::now();
        let thumb_path = self.thumbnails.thumb_path(id);

        let (width, height) = {
            let source = path.to_path_buf();
            let dest = thumb_path.clone();
            let target_width = self.thumbnails.width;
            tokio::task::spawn_blocking(move || render_thumbnail(&source, &dest, target_width))
                .await??
        };

        let ocr_text = self.ocr.extract_text(path).await;

        let artifacts = DerivedArtifacts {
            thumb: thumb_path.to_string_lossy().into_owned(),
            width,
            height,
            ocr_text,
        };
        let sync = self.store.complete(id, &artifacts).await?;

        tracing::info!(
            width = width,
            height = height,
            ocr_chars = artifacts.ocr_text.len(),
            index_synced = sync.is_synced(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Image processed"
        );
        Ok(artifacts)
    }
}
