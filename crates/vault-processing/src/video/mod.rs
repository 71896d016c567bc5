//! Video processing

pub mod extractor;
pub mod frame;

pub use extractor::VideoFrameExtractor;
pub use frame::{FfmpegFrameEngine, FrameEngine};
