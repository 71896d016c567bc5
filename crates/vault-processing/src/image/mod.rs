//! Still image processing: thumbnail, pixel dimensions and OCR.

pub mod processor;

pub use processor::{render_thumbnail, thumbnail_dimensions, ImageProcessor, ThumbnailConfig};
