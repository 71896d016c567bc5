//! Video frame extractor
//!
//! Videos (and animated GIFs) are processed through their first frame: the
//! frame is written to a temporary JPEG, handed to the image processor under
//! the original media id, and removed afterwards whatever the outcome.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use vault_core::models::DerivedArtifacts;

use crate::error::ProcessingError;
use crate::image::ImageProcessor;
use crate::video::frame::FrameEngine;

pub struct VideoFrameExtractor {
    engine: Arc<dyn FrameEngine>,
    images: Arc<ImageProcessor>,
    frame_dir: PathBuf,
}

impl VideoFrameExtractor {
    pub fn new(
        engine: Arc<dyn FrameEngine>,
        images: Arc<ImageProcessor>,
        frame_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            engine,
            images,
            frame_dir: frame_dir.into(),
        }
    }

    /// `<frame_dir>/<id>_frame.jpg`
    pub fn frame_path(&self, id: Uuid) -> PathBuf {
        self.frame_dir.join(format!("{}_frame.jpg", id))
    }

    #[tracing::instrument(skip(self, path), fields(media.id = %id, path = %path.display()))]
    pub async fn process(&self, id: Uuid, path: &Path) -> Result<DerivedArtifacts, ProcessingError> {
        let frame_path = self.frame_path(id);
        let result = self.extract_and_process(id, path, &frame_path).await;
        remove_frame(&frame_path).await;
        result
    }

    async fn extract_and_process(
        &self,
        id: Uuid,
        path: &Path,
        frame_path: &Path,
    ) -> Result<DerivedArtifacts, ProcessingError> {
        tokio::fs::create_dir_all(&self.frame_dir)
            .await
            .map_err(|source| ProcessingError::Io {
                path: self.frame_dir.clone(),
                source,
            })?;

        self.engine
            .extract_first_frame(path, frame_path)
            .await
            .map_err(|source| ProcessingError::FrameExtraction {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(frame = %frame_path.display(), "First frame extracted");

        self.images.process(id, frame_path).await
    }
}

/// Best-effort removal of the temporary frame. A missing file is fine.
async fn remove_frame(frame_path: &Path) {
    match tokio::fs::remove_file(frame_path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(
                error = %e,
                frame = %frame_path.display(),
                "Failed to remove temporary frame"
            );
        }
    }
}
