//! `SQLite` connection handling for the five state stores.
//!
//! One pool, one writer connection: per-session work is already
//! serialized by the lock store, and the OCC save is a single
//! conditional UPDATE, so a wider pool would only add WAL write
//! contention. Schema bootstrap runs on every connect and converges.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::{AppError, Result};

use super::schema;

/// Alias for the shared `SQLite` connection pool.
pub type Database = SqlitePool;

/// How long a statement waits on a busy database before erroring.
/// Lock acquisition and OCC saves race across workers by design.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open the file-backed database, creating the file and its parent
/// directories on first boot.
///
/// # Errors
///
/// Returns `AppError::Db` if the path is unusable, the connection
/// fails, or schema bootstrap fails.
pub async fn connect(path: &str) -> Result<Database> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)
            .map_err(|err| AppError::Db(format!("failed to create state store dir: {err}")))?;
    }

    let options = SqliteConnectOptions::from_str(path)
        .map_err(|err| AppError::Db(format!("invalid state store path: {err}")))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    build_pool(SqlitePoolOptions::new().max_connections(1), options).await
}

/// Open an in-memory database for the test suites.
///
/// `min_connections(1)` pins a connection so the database outlives
/// individual statements.
///
/// # Errors
///
/// Returns `AppError::Db` if the connection or schema bootstrap fails.
pub async fn connect_memory() -> Result<Database> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|err| AppError::Db(format!("invalid memory uri: {err}")))?
        .busy_timeout(BUSY_TIMEOUT);

    build_pool(
        SqlitePoolOptions::new().max_connections(1).min_connections(1),
        options,
    )
    .await
}

async fn build_pool(
    pool_options: SqlitePoolOptions,
    options: SqliteConnectOptions,
) -> Result<Database> {
    let pool = pool_options.connect_with(options).await?;
    schema::bootstrap_schema(&pool).await?;
    Ok(pool)
}
