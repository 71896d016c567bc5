//! Test helpers
//!
//! Each [`TestDatabase`] is a migrated SQLite file inside its own temporary
//! directory, removed when the value is dropped.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};
use std::time::Duration;
use tempfile::TempDir;

use crate::pool::connect_with;

pub struct TestDatabase {
    pub pool: SqlitePool,
    pub dir: TempDir,
}

impl TestDatabase {
    pub async fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let options = SqliteConnectOptions::new()
            .filename(dir.path().join("vault-test.db"))
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal);
        let pool = connect_with(options, 4)
            .await
            .expect("Failed to open test database");
        Self { pool, dir }
    }
}
