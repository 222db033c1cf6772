//! Pending action repository for `SQLite` persistence.
//!
//! Transitions are state-machine-safe: the UPDATE carries the expected
//! source status in its WHERE clause, so a concurrent transition loses
//! and surfaces as a conflict instead of silently double-applying.

use std::sync::Arc;

use chrono::Utc;

use crate::models::pending::{
    is_valid_transition, PendingAction, PendingFlow, PendingStatus,
};
use crate::{AppError, Result};

use super::db::Database;

/// Repository wrapper around `SQLite` for pending action records.
#[derive(Clone)]
pub struct PendingRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct PendingRow {
    action_id: String,
    session_id: String,
    flow: String,
    payload: String,
    description: String,
    status: String,
    created_at: String,
    expires_at: String,
}

impl PendingRow {
    /// Convert a database row into the domain model.
    fn into_action(self) -> Result<PendingAction> {
        let flow = parse_flow(&self.flow)?;
        let status = parse_status(&self.status)?;
        let payload: serde_json::Value = serde_json::from_str(&self.payload)
            .map_err(|e| AppError::Db(format!("invalid pending payload json: {e}")))?;
        let created_at = chrono::DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| AppError::Db(format!("invalid created_at: {e}")))?
            .with_timezone(&Utc);
        let expires_at = chrono::DateTime::parse_from_rfc3339(&self.expires_at)
            .map_err(|e| AppError::Db(format!("invalid expires_at: {e}")))?
            .with_timezone(&Utc);

        Ok(PendingAction {
            action_id: self.action_id,
            session_id: self.session_id,
            flow,
            payload,
            description: self.description,
            status,
            created_at,
            expires_at,
        })
    }
}

/// Parse a flow string into the domain enum.
fn parse_flow(s: &str) -> Result<PendingFlow> {
    match s {
        "escala_commit" => Ok(PendingFlow::EscalaCommit),
        "clinical_commit" => Ok(PendingFlow::ClinicalCommit),
        "finalize_commit" => Ok(PendingFlow::FinalizeCommit),
        other => Err(AppError::Db(format!("invalid pending flow: {other}"))),
    }
}

/// Serialize a flow enum to its database string.
fn flow_str(f: PendingFlow) -> &'static str {
    match f {
        PendingFlow::EscalaCommit => "escala_commit",
        PendingFlow::ClinicalCommit => "clinical_commit",
        PendingFlow::FinalizeCommit => "finalize_commit",
    }
}

/// Parse a status string into the domain enum.
fn parse_status(s: &str) -> Result<PendingStatus> {
    match s {
        "staged" => Ok(PendingStatus::Staged),
        "confirmed" => Ok(PendingStatus::Confirmed),
        "executed" => Ok(PendingStatus::Executed),
        "cancelled" => Ok(PendingStatus::Cancelled),
        other => Err(AppError::Db(format!("invalid pending status: {other}"))),
    }
}

/// Serialize a status enum to its database string.
fn status_str(s: PendingStatus) -> &'static str {
    match s {
        PendingStatus::Staged => "staged",
        PendingStatus::Confirmed => "confirmed",
        PendingStatus::Executed => "executed",
        PendingStatus::Cancelled => "cancelled",
    }
}

impl PendingRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Stage a new pending action for a session.
    ///
    /// Any earlier staged action for the session is cancelled first so at
    /// most one staged action exists per session.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if a statement fails.
    pub async fn put(&self, action: &PendingAction) -> Result<()> {
        sqlx::query(
            "UPDATE pending_action SET status = 'cancelled'
             WHERE session_id = ?1 AND status = 'staged'",
        )
        .bind(&action.session_id)
        .execute(self.db.as_ref())
        .await?;

        sqlx::query(
            "INSERT INTO pending_action (action_id, session_id, flow, payload, description,
             status, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&action.action_id)
        .bind(&action.session_id)
        .bind(flow_str(action.flow))
        .bind(action.payload.to_string())
        .bind(&action.description)
        .bind(status_str(action.status))
        .bind(action.created_at.to_rfc3339())
        .bind(action.expires_at.to_rfc3339())
        .execute(self.db.as_ref())
        .await?;

        Ok(())
    }

    /// Retrieve the staged action for a session, if any.
    ///
    /// Expired staged actions are cancelled in place and not returned.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_staged(&self, session_id: &str) -> Result<Option<PendingAction>> {
        let row: Option<PendingRow> = sqlx::query_as(
            "SELECT * FROM pending_action WHERE session_id = ?1 AND status = 'staged'
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(session_id)
        .fetch_optional(self.db.as_ref())
        .await?;

        let Some(row) = row else { return Ok(None) };
        let action = row.into_action()?;

        if action.is_expired(Utc::now()) {
            self.transition(
                session_id,
                &action.action_id,
                PendingStatus::Staged,
                PendingStatus::Cancelled,
            )
            .await?;
            return Ok(None);
        }
        Ok(Some(action))
    }

    /// Retrieve an action by identifier.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_by_id(&self, action_id: &str) -> Result<Option<PendingAction>> {
        let row: Option<PendingRow> =
            sqlx::query_as("SELECT * FROM pending_action WHERE action_id = ?1")
                .bind(action_id)
                .fetch_optional(self.db.as_ref())
                .await?;

        row.map(PendingRow::into_action).transpose()
    }

    /// Apply a lifecycle transition conditionally.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Invariant` for an illegal transition,
    /// `AppError::Conflict` when the action is no longer in `from`, and
    /// `AppError::Db` on persistence failures.
    pub async fn transition(
        &self,
        session_id: &str,
        action_id: &str,
        from: PendingStatus,
        to: PendingStatus,
    ) -> Result<()> {
        if !is_valid_transition(from, to) {
            return Err(AppError::Invariant(format!(
                "illegal pending transition {} -> {}",
                status_str(from),
                status_str(to)
            )));
        }

        let updated = sqlx::query(
            "UPDATE pending_action SET status = ?1
             WHERE session_id = ?2 AND action_id = ?3 AND status = ?4",
        )
        .bind(status_str(to))
        .bind(session_id)
        .bind(action_id)
        .bind(status_str(from))
        .execute(self.db.as_ref())
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "pending action {action_id} is not {}",
                status_str(from)
            )));
        }
        Ok(())
    }

    /// Count staged actions that have already expired.
    ///
    /// Startup recovery reporting only.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn count_expired_staged(&self) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pending_action WHERE status = 'staged' AND expires_at < ?1",
        )
        .bind(&now)
        .fetch_one(self.db.as_ref())
        .await?;
        Ok(count)
    }

    /// Delete terminal records older than the cutoff.
    ///
    /// Retention path only.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the delete fails.
    pub async fn purge_terminal_before(&self, cutoff_rfc3339: &str) -> Result<u64> {
        let deleted = sqlx::query(
            "DELETE FROM pending_action
             WHERE status IN ('executed', 'cancelled') AND created_at < ?1",
        )
        .bind(cutoff_rfc3339)
        .execute(self.db.as_ref())
        .await?;
        Ok(deleted.rows_affected())
    }
}
