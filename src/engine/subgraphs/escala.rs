//! Attendance subgraph.
//!
//! idle → awaiting_user_confirm → staged → committed | cancelled.
//! A commit is staged from the caregiver's message and executed only
//! after an explicit confirmation.

use serde_json::json;
use tracing::warn;

use crate::engine::subgraphs::SubgraphOutcome;
use crate::engine::{bootstrap, Engine};
use crate::llm::types::ConfirmationVerdict;
use crate::models::outcome::OutcomeCode;
use crate::models::pending::{PendingAction, PendingFlow, PendingStatus};
use crate::models::session::SessionState;
use crate::{AppError, Result};

/// Phrases that read as "I will not attend".
const CANCEL_HINTS: [&str; 8] = [
    "não vou",
    "nao vou",
    "não poderei",
    "nao poderei",
    "não conseguirei",
    "nao conseguirei",
    "imprevisto",
    "desmarcar",
];

/// Stage an attendance commit from the caregiver's message.
///
/// # Errors
///
/// Returns `AppError::Db` if the pending store write fails.
pub async fn handle(
    engine: &Engine,
    state: &mut SessionState,
    text: &str,
) -> Result<SubgraphOutcome> {
    let Some(schedule_id) = state.schedule_id.clone() else {
        return Ok(SubgraphOutcome::done(OutcomeCode::HelpContext));
    };

    let lower = text.to_lowercase();
    let response_value = if CANCEL_HINTS.iter().any(|hint| lower.contains(hint)) {
        "cancelado"
    } else {
        "confirmado"
    };

    let action = PendingAction::new(
        &state.session_id,
        PendingFlow::EscalaCommit,
        json!({ "scheduleId": schedule_id, "responseValue": response_value }),
        format!("registrar resposta de presença: {response_value}"),
    );
    engine.pending.put(&action).await?;

    Ok(SubgraphOutcome::done(OutcomeCode::EscalaStaged))
}

/// Resolve a staged attendance commit with the caregiver's answer.
///
/// # Errors
///
/// Returns `AppError::Db` if a pending transition fails.
pub async fn resolve(
    engine: &Engine,
    state: &mut SessionState,
    action: &PendingAction,
    verdict: ConfirmationVerdict,
) -> Result<SubgraphOutcome> {
    match verdict {
        ConfirmationVerdict::Unclear => Ok(SubgraphOutcome::done(OutcomeCode::EscalaStaged)),
        ConfirmationVerdict::No | ConfirmationVerdict::Cancel => {
            engine
                .pending
                .transition(
                    &state.session_id,
                    &action.action_id,
                    PendingStatus::Staged,
                    PendingStatus::Cancelled,
                )
                .await?;
            state.resume_after = None;
            Ok(SubgraphOutcome::done(OutcomeCode::EscalaCancelled))
        }
        ConfirmationVerdict::Yes => execute(engine, state, action).await,
    }
}

async fn execute(
    engine: &Engine,
    state: &mut SessionState,
    action: &PendingAction,
) -> Result<SubgraphOutcome> {
    let schedule_identifier = payload_str(action, "scheduleId")?;
    let response_value = payload_str(action, "responseValue")?;

    let request = crate::backend::types::UpdateScheduleRequest {
        schedule_identifier,
        response_value: response_value.clone(),
        action_id: action.action_id.clone(),
    };

    match engine.backend.update_work_schedule_response(&request).await {
        Ok(()) => {
            engine
                .pending
                .transition(
                    &state.session_id,
                    &action.action_id,
                    PendingStatus::Staged,
                    PendingStatus::Confirmed,
                )
                .await?;
            engine
                .pending
                .transition(
                    &state.session_id,
                    &action.action_id,
                    PendingStatus::Confirmed,
                    PendingStatus::Executed,
                )
                .await?;

            state.response = bootstrap::parse_response(&response_value);
            state.resume_after = None;
            // Re-seed the shift context so downstream gates see the
            // committed response.
            bootstrap::hydrate(engine, state).await;
            Ok(SubgraphOutcome::done(OutcomeCode::EscalaConfirmed))
        }
        Err(err @ (AppError::BackendTransient(_) | AppError::Timeout(_))) => {
            warn!(%err, "attendance commit failed transiently; action stays staged");
            Ok(SubgraphOutcome::done(OutcomeCode::EscalaCommitFailed))
        }
        Err(err) => {
            warn!(%err, "attendance commit failed permanently; cancelling action");
            engine
                .pending
                .transition(
                    &state.session_id,
                    &action.action_id,
                    PendingStatus::Staged,
                    PendingStatus::Cancelled,
                )
                .await?;
            Ok(SubgraphOutcome::done(OutcomeCode::EscalaCommitFailed))
        }
    }
}

fn payload_str(action: &PendingAction, key: &str) -> Result<String> {
    action
        .payload
        .get(key)
        .and_then(serde_json::Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| {
            AppError::Invariant(format!(
                "pending action {} payload missing {key}",
                action.action_id
            ))
        })
}
