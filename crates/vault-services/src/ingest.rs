//! Ingestion gateway helpers: validation, MIME detection and staging.

use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use vault_core::{AppError, Config};

/// A file to add to the library.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    /// Where the bytes are read from.
    pub source: PathBuf,
    /// Name used for MIME detection; defaults to the source file name.
    pub original_name: Option<String>,
    pub tags: String,
}

impl IngestRequest {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            original_name: None,
            tags: String::new(),
        }
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = tags.into();
        self
    }

    pub fn with_original_name(mut self, name: impl Into<String>) -> Self {
        self.original_name = Some(name.into());
        self
    }

    /// The name MIME detection and the staged extension are based on.
    pub fn file_name(&self) -> Result<String, AppError> {
        if let Some(name) = self.original_name.as_deref().map(str::trim) {
            if !name.is_empty() {
                return Ok(name.to_string());
            }
        }
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                AppError::InvalidInput(format!(
                    "Cannot determine a file name for {}",
                    self.source.display()
                ))
            })
    }
}

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub storage_dir: PathBuf,
    pub max_file_size_bytes: u64,
}

impl From<&Config> for IngestConfig {
    fn from(config: &Config) -> Self {
        Self {
            storage_dir: config.storage_dir.clone(),
            max_file_size_bytes: config.max_file_size_bytes,
        }
    }
}

/// Check the source is a non-empty regular file within the size limit and
/// return its size.
pub async fn validate_upload(source: &Path, max_file_size_bytes: u64) -> Result<u64, AppError> {
    let metadata = fs::metadata(source).await.map_err(|e| {
        AppError::InvalidInput(format!("Cannot read {}: {}", source.display(), e))
    })?;

    if !metadata.is_file() {
        return Err(AppError::InvalidInput(format!(
            "{} is not a regular file",
            source.display()
        )));
    }

    let size = metadata.len();
    if size == 0 {
        return Err(AppError::InvalidInput(format!(
            "{} is empty",
            source.display()
        )));
    }
    if size > max_file_size_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "{} is {} bytes; the limit is {} bytes",
            source.display(),
            size,
            max_file_size_bytes
        )));
    }

    Ok(size)
}

/// MIME type from the file name's extension, `application/octet-stream`
/// when unknown.
pub fn guess_mime(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Lowercased extension, kept only when it is plain alphanumeric.
fn safe_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
}

/// `<storage_dir>/<id>.<ext>`, or `<storage_dir>/<id>` without a usable extension.
pub fn staged_path(storage_dir: &Path, id: Uuid, file_name: &str) -> PathBuf {
    match safe_extension(file_name) {
        Some(ext) => storage_dir.join(format!("{}.{}", id, ext)),
        None => storage_dir.join(id.to_string()),
    }
}

/// Copy the source bytes into the storage directory.
#[tracing::instrument(skip(source, dest), fields(source = %source.display(), dest = %dest.display()))]
pub async fn stage_upload(source: &Path, dest: &Path) -> Result<(), AppError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await.map_err(|e| {
            AppError::Storage(format!(
                "Failed to create storage directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let start = std::time::Instant::now();
    let copied = fs::copy(source, dest).await.map_err(|e| {
        AppError::Storage(format!(
            "Failed to stage {} at {}: {}",
            source.display(),
            dest.display(),
            e
        ))
    })?;

    tracing::debug!(
        size_bytes = copied,
        duration_ms = start.elapsed().as_millis() as u64,
        "Upload staged"
    );
    Ok(())
}
