//! Optical character recognition.
//!
//! OCR is best-effort: any failure degrades to empty text and never fails
//! the enclosing job.

use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

use crate::command::{CommandError, ExternalCommand};

#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Text recognised in the image, trimmed. Empty when nothing was found
    /// or the engine failed.
    async fn extract_text(&self, image: &Path) -> String;
}

/// Tesseract CLI: `tesseract <image> stdout -l <language>`.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    command: ExternalCommand,
    language: String,
}

impl TesseractOcr {
    pub fn new(
        tesseract_path: impl Into<String>,
        language: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CommandError> {
        Ok(Self {
            command: ExternalCommand::new(tesseract_path, timeout)?,
            language: language.into(),
        })
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    #[tracing::instrument(skip(self), fields(image = %image.display()))]
    async fn extract_text(&self, image: &Path) -> String {
        let args = [
            image.as_os_str(),
            OsStr::new("stdout"),
            OsStr::new("-l"),
            OsStr::new(&self.language),
        ];
        match self.command.run(args).await {
            Ok(stdout) => String::from_utf8_lossy(&stdout).trim().to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "OCR failed, continuing with empty text");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_engine_degrades_to_empty_text() {
        let ocr = TesseractOcr::new("mediavault-no-such-ocr", "eng", Duration::from_secs(5))
            .unwrap();
        assert_eq!(ocr.extract_text(Path::new("missing.png")).await, "");
    }
}
