use std::path::PathBuf;
use thiserror::Error;

use vault_core::AppError;

use crate::command::CommandError;

/// Failure of one processing job. The record keeps its prior status.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to save thumbnail {path}: {source}")]
    ThumbnailSave {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Thumbnail for {path} would be {width}x{height} pixels")]
    ThumbnailTooLarge { path: PathBuf, width: u32, height: u32 },

    #[error("Failed to extract first frame from {path}: {source}")]
    FrameExtraction {
        path: PathBuf,
        #[source]
        source: CommandError,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to persist processing results: {0}")]
    Persistence(#[from] AppError),

    #[error("Blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
