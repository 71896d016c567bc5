//! MediaVault processing pipeline
//!
//! Everything a worker does with a job once it is dequeued:
//! - routing by MIME type ([`dispatcher`])
//! - thumbnail, dimensions and OCR for still images ([`image`])
//! - first-frame extraction for videos and animated images ([`video`])
//! - the external tool runner used by OCR and frame extraction ([`command`])

pub mod command;
pub mod dispatcher;
pub mod error;
pub mod image;
pub mod ocr;
pub mod test_helpers;
pub mod video;

pub use command::{CommandError, ExternalCommand};
pub use dispatcher::{route, MediaDispatcher, MediaRoute};
pub use error::ProcessingError;
pub use self::image::{ImageProcessor, ThumbnailConfig};
pub use ocr::{OcrEngine, TesseractOcr};
pub use video::{FfmpegFrameEngine, FrameEngine, VideoFrameExtractor};
