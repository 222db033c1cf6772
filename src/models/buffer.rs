//! Conversation buffer entry model.
//!
//! Append-only, ordered by epoch milliseconds per session. Entries expire
//! after the operational retention window; the hot path never reads the
//! full history.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Message direction relative to this service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Received from the caregiver via the gateway.
    In,
    /// Sent back to the caregiver.
    Out,
}

/// One conversation buffer entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct BufferEntry {
    /// Owning session identifier.
    pub session_id: String,
    /// Epoch milliseconds; partition sort key.
    pub created_at_epoch: i64,
    /// Message direction.
    pub direction: Direction,
    /// Message text.
    pub text: String,
    /// Gateway message id (inbound) or outcome code (outbound).
    pub message_id: String,
    /// Optional structured metadata.
    pub meta: Option<serde_json::Value>,
}

impl BufferEntry {
    /// Entry for a message received from the caregiver.
    #[must_use]
    pub fn inbound(session_id: &str, message_id: &str, text: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            created_at_epoch: Utc::now().timestamp_millis(),
            direction: Direction::In,
            text: text.to_string(),
            message_id: message_id.to_string(),
            meta: None,
        }
    }

    /// Entry for a reply sent back to the caregiver.
    #[must_use]
    pub fn outbound(session_id: &str, outcome_code: &str, text: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            created_at_epoch: Utc::now().timestamp_millis(),
            direction: Direction::Out,
            text: text.to_string(),
            message_id: outcome_code.to_string(),
            meta: None,
        }
    }
}
