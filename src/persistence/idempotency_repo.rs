//! Idempotency record store.
//!
//! A record maps a request key to the exact response already returned.
//! Replays inside the TTL return that response verbatim without invoking
//! the engine.

use std::sync::Arc;

use chrono::Utc;

use crate::Result;

use super::db::Database;

/// Cached response for an idempotency key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    /// HTTP status code returned the first time.
    pub status_code: u16,
    /// Exact response body returned the first time.
    pub response_body: String,
}

/// Repository wrapper around `SQLite` for idempotency records.
#[derive(Clone)]
pub struct IdempotencyRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct IdempotencyRow {
    status_code: i64,
    response_body: String,
}

impl IdempotencyRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Look up an unexpired record for `key`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get(&self, key: &str, ttl_secs: u64) -> Result<Option<CachedResponse>> {
        let cutoff =
            Utc::now().timestamp_millis() - i64::try_from(ttl_secs * 1000).unwrap_or(i64::MAX);
        let row: Option<IdempotencyRow> = sqlx::query_as(
            "SELECT status_code, response_body FROM idempotency
             WHERE idempotency_key = ?1 AND created_at_epoch >= ?2",
        )
        .bind(key)
        .bind(cutoff)
        .fetch_optional(self.db.as_ref())
        .await?;

        Ok(row.map(|r| CachedResponse {
            status_code: u16::try_from(r.status_code).unwrap_or(500),
            response_body: r.response_body,
        }))
    }

    /// Record the response for `key`. A replayed insert keeps the first
    /// record so the earliest response stays authoritative.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails.
    pub async fn put(&self, key: &str, status_code: u16, response_body: &str) -> Result<()> {
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO idempotency (idempotency_key, status_code, response_body, created_at,
             created_at_epoch)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(idempotency_key) DO NOTHING",
        )
        .bind(key)
        .bind(i64::from(status_code))
        .bind(response_body)
        .bind(now.to_rfc3339())
        .bind(now.timestamp_millis())
        .execute(self.db.as_ref())
        .await?;

        Ok(())
    }

    /// Delete records older than the cutoff epoch.
    ///
    /// Retention path only.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the delete fails.
    pub async fn purge_before(&self, cutoff_epoch: i64) -> Result<u64> {
        let deleted = sqlx::query("DELETE FROM idempotency WHERE created_at_epoch < ?1")
            .bind(cutoff_epoch)
            .execute(self.db.as_ref())
            .await?;
        Ok(deleted.rows_affected())
    }
}
