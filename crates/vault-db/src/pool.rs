//! Connection pool construction and schema migrations.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

use vault_core::{AppError, Config};

const ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Parse a `sqlite://` URL and apply the pragmas every pooled connection uses.
pub fn connect_options(
    database_url: &str,
    busy_timeout: Duration,
) -> Result<SqliteConnectOptions, AppError> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        // busy_timeout is per-connection; concurrent worker writes wait instead of failing
        .busy_timeout(busy_timeout)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);
    Ok(options)
}

/// Open a pool with explicit options and bring the schema up to date.
pub async fn connect_with(
    options: SqliteConnectOptions,
    max_connections: u32,
) -> Result<SqlitePool, AppError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

/// Open the configured database. Failure here is fatal for the process.
#[tracing::instrument(skip(config), fields(db.url = %config.database_url))]
pub async fn connect(config: &Config) -> Result<SqlitePool, AppError> {
    let options = connect_options(&config.database_url, config.db_busy_timeout())?;
    let pool = connect_with(options, config.db_max_connections).await?;
    tracing::info!(
        max_connections = config.db_max_connections,
        "Database connection established"
    );
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| AppError::InternalWithSource {
            message: format!("Failed to run database migrations: {}", e),
            source: e.into(),
        })
}
