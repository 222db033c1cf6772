//! Outcome codes produced by the subgraphs and the pipeline.
//!
//! Every processed message resolves to exactly one code; the consolidator
//! keys both the generated reply and the deterministic fallback on it.

use serde::{Deserialize, Serialize};

/// Closed set of per-message outcomes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeCode {
    /// Attendance action staged, awaiting confirmation.
    EscalaStaged,
    /// Attendance response committed to the backend.
    EscalaConfirmed,
    /// Staged attendance action cancelled by the caregiver.
    EscalaCancelled,
    /// Attendance commit failed on the backend.
    EscalaCommitFailed,
    /// Clinical fields still missing; asked for the subset.
    ClinicalMissing,
    /// Clinical record staged, awaiting confirmation.
    ClinicalStaged,
    /// Clinical record committed.
    ClinicalCommitted,
    /// Standalone note committed without staging.
    ClinicalNoteOnlyCommitted,
    /// First measurement incomplete; commit refused.
    ClinicalRejectedIncompleteFirst,
    /// Clinical commit failed on the backend; buffer kept.
    ClinicalCommitFailed,
    /// Operational note delivered to the workflow webhook.
    OperationalDelivered,
    /// Operational note delivery failed.
    OperationalDeliveryFailed,
    /// One or more finalization topics collected.
    FinalizeTopicCollected,
    /// Finalization summary staged, awaiting confirmation.
    FinalizeStaged,
    /// Finalization summary committed; shift closed.
    FinalizeCommitted,
    /// Finalization commit failed on the backend.
    FinalizeCommitFailed,
    /// Generic help reply.
    HelpGeneric,
    /// Contextual help reply naming what is missing.
    HelpContext,
    /// Session busy: lock denied.
    Busy,
    /// Per-request deadline elapsed.
    Timeout,
    /// Optimistic-concurrency retries exhausted.
    Conflict,
    /// Malformed inbound request.
    InputError,
}

impl OutcomeCode {
    /// Wire representation, also stored as `last_reply_code`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EscalaStaged => "escala_staged",
            Self::EscalaConfirmed => "escala_confirmed",
            Self::EscalaCancelled => "escala_cancelled",
            Self::EscalaCommitFailed => "escala_commit_failed",
            Self::ClinicalMissing => "clinical_missing",
            Self::ClinicalStaged => "clinical_staged",
            Self::ClinicalCommitted => "clinical_committed",
            Self::ClinicalNoteOnlyCommitted => "clinical_note_only_committed",
            Self::ClinicalRejectedIncompleteFirst => "clinical_rejected_incomplete_first",
            Self::ClinicalCommitFailed => "clinical_commit_failed",
            Self::OperationalDelivered => "operational_delivered",
            Self::OperationalDeliveryFailed => "operational_delivery_failed",
            Self::FinalizeTopicCollected => "finalize_topic_collected",
            Self::FinalizeStaged => "finalize_staged",
            Self::FinalizeCommitted => "finalize_committed",
            Self::FinalizeCommitFailed => "finalize_commit_failed",
            Self::HelpGeneric => "help_generic",
            Self::HelpContext => "help_context",
            Self::Busy => "busy",
            Self::Timeout => "timeout",
            Self::Conflict => "conflict",
            Self::InputError => "input_error",
        }
    }

    /// Whether the turn mutated no durable state.
    #[must_use]
    pub fn is_terminal_error(self) -> bool {
        matches!(
            self,
            Self::Busy | Self::Timeout | Self::Conflict | Self::InputError
        )
    }
}

impl std::fmt::Display for OutcomeCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
