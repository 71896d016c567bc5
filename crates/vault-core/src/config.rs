//! Configuration module
//!
//! Settings are read from the environment (after loading `.env` through
//! `dotenvy`). Every value has a default so a bare invocation works against a
//! local `vault.db`.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DATABASE_URL: &str = "sqlite://vault.db";
const DB_MAX_CONNECTIONS: u32 = 5;
const DB_BUSY_TIMEOUT_MS: u64 = 5000;
const STORAGE_DIR: &str = "storage";
const THUMBNAIL_DIR: &str = "static";
const FRAME_DIR: &str = "static";
const JOB_QUEUE_SIZE: usize = 100;
const WORKER_COUNT: usize = 4;
const THUMBNAIL_WIDTH: u32 = 200;
const TESSERACT_PATH: &str = "tesseract";
const OCR_LANGUAGE: &str = "eng";
const FFMPEG_PATH: &str = "ffmpeg";
const FRAME_QUALITY: u8 = 2;
const EXTERNAL_TOOL_TIMEOUT_SECS: u64 = 120;
const MAX_FILE_SIZE_MB: u64 = 100;

#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    pub log_format: String,
    // Database
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_busy_timeout_ms: u64,
    // Filesystem layout
    pub storage_dir: PathBuf,
    pub thumbnail_dir: PathBuf,
    pub frame_dir: PathBuf,
    // Pipeline
    pub job_queue_size: usize,
    pub worker_count: usize,
    pub thumbnail_width: u32,
    pub max_file_size_bytes: u64,
    // External tools
    pub tesseract_path: String,
    pub ocr_language: String,
    pub ffmpeg_path: String,
    pub frame_quality: u8,
    pub external_tool_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_format: "pretty".to_string(),
            database_url: DATABASE_URL.to_string(),
            db_max_connections: DB_MAX_CONNECTIONS,
            db_busy_timeout_ms: DB_BUSY_TIMEOUT_MS,
            storage_dir: PathBuf::from(STORAGE_DIR),
            thumbnail_dir: PathBuf::from(THUMBNAIL_DIR),
            frame_dir: PathBuf::from(FRAME_DIR),
            job_queue_size: JOB_QUEUE_SIZE,
            worker_count: WORKER_COUNT,
            thumbnail_width: THUMBNAIL_WIDTH,
            max_file_size_bytes: MAX_FILE_SIZE_MB * 1024 * 1024,
            tesseract_path: TESSERACT_PATH.to_string(),
            ocr_language: OCR_LANGUAGE.to_string(),
            ffmpeg_path: FFMPEG_PATH.to_string(),
            frame_quality: FRAME_QUALITY,
            external_tool_timeout_secs: EXTERNAL_TOOL_TIMEOUT_SECS,
        }
    }
}

/// Parse `key` through `lookup`, falling back to `default` when unset or malformed.
fn parsed_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|value| value.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn string_or<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from an arbitrary key lookup (the environment in
    /// production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let max_file_size_mb = parsed_or(&lookup, "MAX_FILE_SIZE_MB", MAX_FILE_SIZE_MB);

        Self {
            environment,
            log_format: string_or(&lookup, "LOG_FORMAT", "pretty").to_lowercase(),
            database_url: string_or(&lookup, "DATABASE_URL", DATABASE_URL),
            db_max_connections: parsed_or(&lookup, "DB_MAX_CONNECTIONS", DB_MAX_CONNECTIONS),
            db_busy_timeout_ms: parsed_or(&lookup, "DB_BUSY_TIMEOUT_MS", DB_BUSY_TIMEOUT_MS),
            storage_dir: PathBuf::from(string_or(&lookup, "STORAGE_DIR", STORAGE_DIR)),
            thumbnail_dir: PathBuf::from(string_or(&lookup, "THUMBNAIL_DIR", THUMBNAIL_DIR)),
            frame_dir: PathBuf::from(string_or(&lookup, "FRAME_DIR", FRAME_DIR)),
            job_queue_size: parsed_or(&lookup, "JOB_QUEUE_SIZE", JOB_QUEUE_SIZE),
            worker_count: parsed_or(&lookup, "WORKER_COUNT", WORKER_COUNT),
            thumbnail_width: parsed_or(&lookup, "THUMBNAIL_WIDTH", THUMBNAIL_WIDTH),
            max_file_size_bytes: max_file_size_mb.saturating_mul(1024 * 1024),
            tesseract_path: string_or(&lookup, "TESSERACT_PATH", TESSERACT_PATH),
            ocr_language: string_or(&lookup, "OCR_LANGUAGE", OCR_LANGUAGE),
            ffmpeg_path: string_or(&lookup, "FFMPEG_PATH", FFMPEG_PATH),
            frame_quality: parsed_or(&lookup, "FRAME_QUALITY", FRAME_QUALITY),
            external_tool_timeout_secs: parsed_or(
                &lookup,
                "EXTERNAL_TOOL_TIMEOUT_SECS",
                EXTERNAL_TOOL_TIMEOUT_SECS,
            ),
        }
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.job_queue_size == 0 {
            anyhow::bail!("JOB_QUEUE_SIZE must be at least 1");
        }
        if self.worker_count == 0 {
            anyhow::bail!("WORKER_COUNT must be at least 1");
        }
        if self.thumbnail_width == 0 {
            anyhow::bail!("THUMBNAIL_WIDTH must be at least 1");
        }
        if self.db_max_connections == 0 {
            anyhow::bail!("DB_MAX_CONNECTIONS must be at least 1");
        }
        if self.external_tool_timeout_secs == 0 {
            anyhow::bail!("EXTERNAL_TOOL_TIMEOUT_SECS must be at least 1");
        }
        if self.max_file_size_bytes == 0 {
            anyhow::bail!("MAX_FILE_SIZE_MB must be at least 1");
        }
        if !(1..=31).contains(&self.frame_quality) {
            anyhow::bail!("FRAME_QUALITY must be between 1 and 31");
        }
        Ok(())
    }

    pub fn db_busy_timeout(&self) -> Duration {
        Duration::from_millis(self.db_busy_timeout_ms)
    }

    pub fn external_tool_timeout(&self) -> Duration {
        Duration::from_secs(self.external_tool_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = config_from(&[]);

        assert_eq!(config.database_url, "sqlite://vault.db");
        assert_eq!(config.job_queue_size, 100);
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.thumbnail_width, 200);
        assert_eq!(config.ocr_language, "eng");
        assert_eq!(config.frame_quality, 2);
        assert_eq!(config.max_file_size_bytes, 100 * 1024 * 1024);
        assert!(config.validate().is_ok());
        assert_eq!(config.environment, "development");
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = config_from(&[
            ("WORKER_COUNT", "8"),
            ("JOB_QUEUE_SIZE", " 16 "),
            ("THUMBNAIL_DIR", "/var/thumbs"),
            ("ENVIRONMENT", "Production"),
            ("LOG_FORMAT", "JSON"),
        ]);

        assert_eq!(config.worker_count, 8);
        assert_eq!(config.job_queue_size, 16);
        assert_eq!(config.thumbnail_dir, PathBuf::from("/var/thumbs"));
        assert_eq!(config.log_format, "json");
        assert_eq!(config.environment, "Production");
    }

    #[test]
    fn test_malformed_numbers_fall_back_to_defaults() {
        let config = config_from(&[("WORKER_COUNT", "many"), ("FRAME_QUALITY", "-3")]);

        assert_eq!(config.worker_count, 4);
        assert_eq!(config.frame_quality, 2);
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        assert!(config_from(&[("WORKER_COUNT", "0")]).validate().is_err());
        assert!(config_from(&[("JOB_QUEUE_SIZE", "0")]).validate().is_err());
        assert!(config_from(&[("THUMBNAIL_WIDTH", "0")]).validate().is_err());
        assert!(config_from(&[("FRAME_QUALITY", "40")]).validate().is_err());
    }
}
