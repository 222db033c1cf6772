//! Per-session distributed lock store.
//!
//! Leases are epoch-millisecond deadlines in a single-row-per-resource
//! table. Acquisition is a conditional upsert: it wins if the row is
//! absent, the lease has expired, or the caller already owns it.

use std::sync::Arc;

use chrono::Utc;

use crate::Result;

use super::db::Database;

/// Repository wrapper around `SQLite` for lock records.
#[derive(Clone)]
pub struct LockRepo {
    db: Arc<Database>,
}

impl LockRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Try to acquire the lock on `resource` for `owner`.
    ///
    /// Returns `true` when the lease was granted (or renewed for the same
    /// owner), `false` when another owner holds an unexpired lease.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the statement fails.
    pub async fn acquire(&self, resource: &str, owner: &str, lease_ms: u64) -> Result<bool> {
        let now = Utc::now().timestamp_millis();
        let lease_until = now + i64::try_from(lease_ms).unwrap_or(i64::MAX);

        let result = sqlx::query(
            "INSERT INTO session_lock (resource, owner, lease_until_epoch)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(resource) DO UPDATE SET
                 owner = excluded.owner,
                 lease_until_epoch = excluded.lease_until_epoch
             WHERE session_lock.lease_until_epoch < ?4
                OR session_lock.owner = excluded.owner",
        )
        .bind(resource)
        .bind(owner)
        .bind(lease_until)
        .bind(now)
        .execute(self.db.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Extend the lease when still held by `owner`.
    ///
    /// Returns `false` if the lease was lost in the meantime.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the statement fails.
    pub async fn renew(&self, resource: &str, owner: &str, lease_ms: u64) -> Result<bool> {
        let now = Utc::now().timestamp_millis();
        let lease_until = now + i64::try_from(lease_ms).unwrap_or(i64::MAX);

        let result = sqlx::query(
            "UPDATE session_lock SET lease_until_epoch = ?1
             WHERE resource = ?2 AND owner = ?3 AND lease_until_epoch >= ?4",
        )
        .bind(lease_until)
        .bind(resource)
        .bind(owner)
        .bind(now)
        .execute(self.db.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Release the lock when held by `owner`. Releasing a lock that was
    /// lost or stolen is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the statement fails.
    pub async fn release(&self, resource: &str, owner: &str) -> Result<()> {
        sqlx::query("DELETE FROM session_lock WHERE resource = ?1 AND owner = ?2")
            .bind(resource)
            .bind(owner)
            .execute(self.db.as_ref())
            .await?;
        Ok(())
    }

    /// Release every lock held by `owner`.
    ///
    /// Graceful-shutdown path: in-flight turns have already failed or
    /// finished, so their leases should not outlive the process.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the statement fails.
    pub async fn release_all_for_owner(&self, owner_prefix: &str) -> Result<u64> {
        let pattern = format!("{owner_prefix}%");
        let deleted = sqlx::query("DELETE FROM session_lock WHERE owner LIKE ?1")
            .bind(&pattern)
            .execute(self.db.as_ref())
            .await?;
        Ok(deleted.rows_affected())
    }
}
