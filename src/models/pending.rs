//! Pending action model for two-phase commits.
//!
//! A staged action waits for the caregiver's explicit confirmation before
//! the backend call executes. Stage → confirm → execute, or stage → cancel.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default staged-action lifetime before it expires unanswered.
const DEFAULT_TTL_MINUTES: i64 = 30;

/// Business flow a pending action belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PendingFlow {
    /// Attendance confirm/cancel against the shift schedule.
    EscalaCommit,
    /// Clinical measurement commit.
    ClinicalCommit,
    /// Shift finalization summary commit.
    FinalizeCommit,
}

impl PendingFlow {
    /// Router-facing flow name.
    #[must_use]
    pub fn flow_name(self) -> &'static str {
        match self {
            Self::EscalaCommit => "escala",
            Self::ClinicalCommit => "clinico",
            Self::FinalizeCommit => "finalizar",
        }
    }
}

/// Lifecycle status of a pending action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PendingStatus {
    /// Staged, awaiting caregiver confirmation.
    Staged,
    /// Caregiver confirmed; execution in progress.
    Confirmed,
    /// Backend call executed successfully.
    Executed,
    /// Caregiver declined or the action expired.
    Cancelled,
}

/// Whether a lifecycle transition is permitted.
///
/// `staged → confirmed → executed` and `staged → cancelled` only.
#[must_use]
pub fn is_valid_transition(from: PendingStatus, to: PendingStatus) -> bool {
    matches!(
        (from, to),
        (PendingStatus::Staged, PendingStatus::Confirmed | PendingStatus::Cancelled)
            | (PendingStatus::Confirmed, PendingStatus::Executed)
    )
}

/// A staged business action awaiting caregiver confirmation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct PendingAction {
    /// Unique action identifier, carried into backend payloads.
    pub action_id: String,
    /// Owning session identifier.
    pub session_id: String,
    /// Business flow.
    pub flow: PendingFlow,
    /// Opaque flow-specific payload.
    pub payload: serde_json::Value,
    /// Caregiver-facing description of what will be committed.
    pub description: String,
    /// Current lifecycle status.
    pub status: PendingStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Expiry timestamp; staged actions past this are ignored.
    pub expires_at: DateTime<Utc>,
}

impl PendingAction {
    /// Construct a new staged action with a generated identifier.
    #[must_use]
    pub fn new(
        session_id: &str,
        flow: PendingFlow,
        payload: serde_json::Value,
        description: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            action_id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            flow,
            payload,
            description,
            status: PendingStatus::Staged,
            created_at: now,
            expires_at: now + Duration::minutes(DEFAULT_TTL_MINUTES),
        }
    }

    /// Whether the action has expired relative to `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}
