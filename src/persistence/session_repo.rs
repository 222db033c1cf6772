//! Session state repository for `SQLite` persistence.
//!
//! The session document is stored as one JSON column guarded by an
//! integer `version` for optimistic concurrency: a save succeeds only when
//! the stored version equals the version the caller loaded, and writes
//! `version + 1`.

use std::sync::Arc;

use chrono::Utc;

use crate::models::session::{canonical_phone, SessionState};
use crate::{AppError, Result};

use super::db::Database;

/// Repository wrapper around `SQLite` for session state documents.
#[derive(Clone)]
pub struct SessionRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct SessionRow {
    state: String,
    version: i64,
}

impl SessionRow {
    /// Convert a database row into the domain model plus its version.
    fn into_state(self) -> Result<(SessionState, i64)> {
        let state: SessionState = serde_json::from_str(&self.state)
            .map_err(|e| AppError::Db(format!("invalid session state json: {e}")))?;
        Ok((state, self.version))
    }
}

impl SessionRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Load the session for a phone number.
    ///
    /// Returns the default state and version 0 when the session does not
    /// exist yet.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query or deserialization fails.
    pub async fn load(&self, phone_number: &str) -> Result<(SessionState, i64)> {
        let session_id = canonical_phone(phone_number);
        let row: Option<SessionRow> =
            sqlx::query_as("SELECT state, version FROM session_state WHERE session_id = ?1")
                .bind(&session_id)
                .fetch_optional(self.db.as_ref())
                .await?;

        match row {
            Some(row) => row.into_state(),
            None => Ok((SessionState::new(phone_number), 0)),
        }
    }

    /// Read the last committed state without taking the session lock.
    ///
    /// Debug read path only; returns `None` for unknown sessions.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn peek(&self, session_id: &str) -> Result<Option<(SessionState, i64)>> {
        let row: Option<SessionRow> =
            sqlx::query_as("SELECT state, version FROM session_state WHERE session_id = ?1")
                .bind(session_id)
                .fetch_optional(self.db.as_ref())
                .await?;

        row.map(SessionRow::into_state).transpose()
    }

    /// Conditionally write the session state.
    ///
    /// Succeeds only if the stored version equals `expected_version`;
    /// writes `expected_version + 1`. `expected_version == 0` inserts the
    /// row and conflicts if another writer created it first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` on a version mismatch and
    /// `AppError::Db` on other persistence failures.
    pub async fn save(&self, state: &SessionState, expected_version: i64) -> Result<i64> {
        let mut doc = state.clone();
        doc.updated_at = Utc::now();
        let json = serde_json::to_string(&doc)
            .map_err(|e| AppError::Db(format!("failed to serialize session state: {e}")))?;
        let updated_at = doc.updated_at.to_rfc3339();
        let next = expected_version + 1;

        if expected_version == 0 {
            let inserted = sqlx::query(
                "INSERT INTO session_state (session_id, phone_number, state, version, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(session_id) DO NOTHING",
            )
            .bind(&doc.session_id)
            .bind(&doc.phone_number)
            .bind(&json)
            .bind(next)
            .bind(&updated_at)
            .execute(self.db.as_ref())
            .await?;

            if inserted.rows_affected() == 0 {
                return Err(AppError::Conflict(format!(
                    "session {} created concurrently",
                    doc.session_id
                )));
            }
            return Ok(next);
        }

        let updated = sqlx::query(
            "UPDATE session_state SET state = ?1, version = ?2, updated_at = ?3
             WHERE session_id = ?4 AND version = ?5",
        )
        .bind(&json)
        .bind(next)
        .bind(&updated_at)
        .bind(&doc.session_id)
        .bind(expected_version)
        .execute(self.db.as_ref())
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "session {} version {} is stale",
                doc.session_id, expected_version
            )));
        }
        Ok(next)
    }
}
