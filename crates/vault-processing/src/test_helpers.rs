//! In-process stand-ins for the OCR and frame extraction tools.

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::command::CommandError;
use crate::ocr::OcrEngine;
use crate::video::FrameEngine;

/// Returns fixed text and remembers which images it was asked about.
#[derive(Debug, Default)]
pub struct StaticOcr {
    text: String,
    calls: Mutex<Vec<PathBuf>>,
}

impl StaticOcr {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl OcrEngine for StaticOcr {
    async fn extract_text(&self, image: &Path) -> String {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(image.to_path_buf());
        self.text.clone()
    }
}

#[derive(Debug, Clone, Copy)]
pub enum FakeFrame {
    /// Write a solid `width`×`height` JPEG frame.
    Solid { width: u32, height: u32 },
    /// Leave a truncated file behind and report failure.
    PartialThenFail,
    /// Fail without touching the output path.
    Fail,
    /// Report success after writing bytes no image decoder accepts.
    Undecodable,
}

#[derive(Debug)]
pub struct FakeFrameEngine {
    behaviour: FakeFrame,
    inputs: Mutex<Vec<PathBuf>>,
}

impl FakeFrameEngine {
    pub fn new(behaviour: FakeFrame) -> Self {
        Self {
            behaviour,
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn inputs(&self) -> Vec<PathBuf> {
        self.inputs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn failure() -> CommandError {
        CommandError::Io {
            program: "fake-ffmpeg".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, "no video stream"),
        }
    }
}

#[async_trait]
impl FrameEngine for FakeFrameEngine {
    async fn extract_first_frame(&self, input: &Path, output: &Path) -> Result<(), CommandError> {
        self.inputs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(input.to_path_buf());

        match self.behaviour {
            FakeFrame::Solid { width, height } => {
                RgbImage::from_pixel(width, height, Rgb([40, 80, 160]))
                    .save_with_format(output, image::ImageFormat::Jpeg)
                    .map_err(|e| CommandError::Io {
                        program: "fake-ffmpeg".to_string(),
                        source: std::io::Error::other(e),
                    })
            }
            FakeFrame::PartialThenFail => {
                std::fs::write(output, [0xFF, 0xD8, 0xFF]).map_err(|source| CommandError::Io {
                    program: "fake-ffmpeg".to_string(),
                    source,
                })?;
                Err(Self::failure())
            }
            FakeFrame::Fail => Err(Self::failure()),
            FakeFrame::Undecodable => {
                std::fs::write(output, b"not a jpeg").map_err(|source| CommandError::Io {
                    program: "fake-ffmpeg".to_string(),
                    source,
                })
            }
        }
    }
}
