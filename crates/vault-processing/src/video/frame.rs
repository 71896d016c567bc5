//! First-frame extraction through ffmpeg.

use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

use crate::command::{CommandError, ExternalCommand};

#[async_trait]
pub trait FrameEngine: Send + Sync {
    /// Write the first frame of `input` as a JPEG at `output`.
    async fn extract_first_frame(&self, input: &Path, output: &Path) -> Result<(), CommandError>;
}

/// `ffmpeg -y -i <input> -vframes 1 -q:v <quality> <output>`
#[derive(Debug, Clone)]
pub struct FfmpegFrameEngine {
    command: ExternalCommand,
    quality: String,
}

impl FfmpegFrameEngine {
    /// `quality` is ffmpeg's JPEG scale, 1 (best) to 31.
    pub fn new(
        ffmpeg_path: impl Into<String>,
        quality: u8,
        timeout: Duration,
    ) -> Result<Self, CommandError> {
        Ok(Self {
            command: ExternalCommand::new(ffmpeg_path, timeout)?,
            quality: quality.clamp(1, 31).to_string(),
        })
    }
}

#[async_trait]
impl FrameEngine for FfmpegFrameEngine {
    #[tracing::instrument(skip(self), fields(input = %input.display(), output = %output.display()))]
    async fn extract_first_frame(&self, input: &Path, output: &Path) -> Result<(), CommandError> {
        let args = [
            OsStr::new("-y"),
            OsStr::new("-loglevel"),
            OsStr::new("error"),
            OsStr::new("-i"),
            input.as_os_str(),
            OsStr::new("-vframes"),
            OsStr::new("1"),
            OsStr::new("-q:v"),
            OsStr::new(&self.quality),
            output.as_os_str(),
        ];
        self.command.run(args).await?;
        Ok(())
    }
}
