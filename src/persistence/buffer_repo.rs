//! Conversation buffer repository for `SQLite` persistence.
//!
//! Append-only. The hot path appends and never reads the full history;
//! reads are bounded by `limit` and ordered by the epoch sort key.

use std::sync::Arc;

use crate::models::buffer::{BufferEntry, Direction};
use crate::{AppError, Result};

use super::db::Database;

/// Repository wrapper around `SQLite` for conversation buffer entries.
#[derive(Clone)]
pub struct BufferRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct BufferRow {
    session_id: String,
    created_at_epoch: i64,
    direction: String,
    text: String,
    message_id: String,
    meta: Option<String>,
}

impl BufferRow {
    /// Convert a database row into the domain model.
    fn into_entry(self) -> Result<BufferEntry> {
        let direction = parse_direction(&self.direction)?;
        let meta = self
            .meta
            .as_deref()
            .map(|s| {
                serde_json::from_str(s)
                    .map_err(|e| AppError::Db(format!("invalid buffer meta json: {e}")))
            })
            .transpose()?;

        Ok(BufferEntry {
            session_id: self.session_id,
            created_at_epoch: self.created_at_epoch,
            direction,
            text: self.text,
            message_id: self.message_id,
            meta,
        })
    }
}

/// Parse a direction string into the domain enum.
fn parse_direction(s: &str) -> Result<Direction> {
    match s {
        "in" => Ok(Direction::In),
        "out" => Ok(Direction::Out),
        other => Err(AppError::Db(format!("invalid buffer direction: {other}"))),
    }
}

/// Serialize a direction enum to its database string.
fn direction_str(d: Direction) -> &'static str {
    match d {
        Direction::In => "in",
        Direction::Out => "out",
    }
}

impl BufferRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Append one entry.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails.
    pub async fn append(&self, entry: &BufferEntry) -> Result<()> {
        let meta = entry.meta.as_ref().map(serde_json::Value::to_string);

        sqlx::query(
            "INSERT INTO conversation_buffer (session_id, created_at_epoch, direction, text,
             message_id, meta)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&entry.session_id)
        .bind(entry.created_at_epoch)
        .bind(direction_str(entry.direction))
        .bind(&entry.text)
        .bind(&entry.message_id)
        .bind(&meta)
        .execute(self.db.as_ref())
        .await?;

        Ok(())
    }

    /// Read entries for a session ordered by the epoch sort key.
    ///
    /// `since` is an exclusive lower bound; `descending` reverses the
    /// default ascending order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn read(
        &self,
        session_id: &str,
        since: Option<i64>,
        limit: u32,
        descending: bool,
    ) -> Result<Vec<BufferEntry>> {
        let order = if descending { "DESC" } else { "ASC" };
        let query = format!(
            "SELECT session_id, created_at_epoch, direction, text, message_id, meta
             FROM conversation_buffer
             WHERE session_id = ?1 AND created_at_epoch > ?2
             ORDER BY created_at_epoch {order}
             LIMIT ?3"
        );

        let rows: Vec<BufferRow> = sqlx::query_as(&query)
            .bind(session_id)
            .bind(since.unwrap_or(i64::MIN))
            .bind(limit)
            .fetch_all(self.db.as_ref())
            .await?;

        rows.into_iter().map(BufferRow::into_entry).collect()
    }

    /// Delete entries older than the cutoff epoch.
    ///
    /// Retention path only.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the delete fails.
    pub async fn purge_before(&self, cutoff_epoch: i64) -> Result<u64> {
        let deleted =
            sqlx::query("DELETE FROM conversation_buffer WHERE created_at_epoch < ?1")
                .bind(cutoff_epoch)
                .execute(self.db.as_ref())
                .await?;
        Ok(deleted.rows_affected())
    }
}
