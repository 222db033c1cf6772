//! Router and gate ladder.
//!
//! Gates are evaluated in a fixed order; the first that fires selects
//! the subgraph and short-circuits. The LLM is consulted only where a
//! deterministic rule cannot decide.

use tracing::{debug, warn};

use crate::engine::Engine;
use crate::llm::types::{ConfirmationVerdict, Intent, OperationalDetect, Urgency};
use crate::models::pending::PendingAction;
use crate::models::session::{ResumeAfter, SessionState};
use crate::{AppError, Result};

/// Subgraph selected for the turn.
#[derive(Debug)]
pub enum Route {
    /// Attendance flow.
    Escala,
    /// Clinical flow.
    Clinico,
    /// Operational note flow, with the detection that fired.
    Operacional(OperationalDetect),
    /// Finalization flow.
    Finalizar,
    /// Help flow.
    Auxiliar,
    /// The message answers a staged action.
    PendingConfirmation(PendingAction, ConfirmationVerdict),
}

/// Deterministic confirmation matcher.
///
/// Handles the common WhatsApp answers without an LLM round-trip;
/// anything else is `None` and goes to the classifier.
#[must_use]
pub fn deterministic_confirmation(text: &str) -> Option<ConfirmationVerdict> {
    let normalized = text.trim().to_lowercase();
    match normalized.as_str() {
        "sim" | "s" | "ok" | "pode" | "claro" | "confirmo" | "confirmar" | "isso"
        | "certo" | "sim!" | "👍" => Some(ConfirmationVerdict::Yes),
        "não" | "nao" | "n" | "não!" | "nao!" => Some(ConfirmationVerdict::No),
        "cancelar" | "cancela" | "cancele" | "cancelado" => Some(ConfirmationVerdict::Cancel),
        _ => None,
    }
}

/// Evaluate the gate ladder for a loaded state and a new message.
///
/// Order: finish-gate → pending-confirmation → operational-note →
/// attendance-gate → LLM intent.
///
/// # Errors
///
/// Never fails today: LLM unavailability at the intent gate degrades to
/// the help flow.
pub async fn route(
    engine: &Engine,
    state: &mut SessionState,
    pending: Option<&PendingAction>,
    text: &str,
) -> Result<Route> {
    // 1. Finish-gate. A staged action wins only when the incoming text
    //    is a confirmation answer, whichever flow staged it.
    if state.finish_reminder_sent {
        if let Some(action) = pending {
            let verdict = resolve_confirmation(engine, text).await;
            if verdict != ConfirmationVerdict::Unclear {
                debug!("finish-gate: routing confirmation to staged action");
                return Ok(Route::PendingConfirmation(action.clone(), verdict));
            }
        }
        debug!("finish-gate fired");
        return Ok(Route::Finalizar);
    }

    // 2. Pending-confirmation. Urgent operational content diverts
    //    without cancelling the staged action.
    if let Some(action) = pending {
        if let Some(verdict) = deterministic_confirmation(text) {
            return Ok(Route::PendingConfirmation(action.clone(), verdict));
        }
        match detect_operational(engine, text).await {
            Some(detect) if detect.is_operational => {
                state.resume_after = Some(ResumeAfter {
                    flow: action.flow.flow_name().to_string(),
                    reason: "nota operacional durante confirmação pendente".to_string(),
                });
                debug!("pending-confirmation: diverting to operational note");
                return Ok(Route::Operacional(detect));
            }
            _ => {}
        }
        let verdict = resolve_confirmation(engine, text).await;
        return Ok(Route::PendingConfirmation(action.clone(), verdict));
    }

    // 3. Operational-note.
    if let Some(detect) = detect_operational(engine, text).await {
        if detect.is_operational {
            debug!("operational-note gate fired");
            return Ok(Route::Operacional(detect));
        }
    }

    // 4. Attendance-gate.
    if state.attendance_pending() {
        debug!("attendance-gate fired");
        return Ok(Route::Escala);
    }

    // 5. LLM intent.
    match engine.llm.classify_intent(text, &state.compact()).await {
        Ok(result) => {
            debug!(intent = ?result.intent, confidence = result.confidence, "intent classified");
            Ok(match result.intent {
                Intent::Escala => Route::Escala,
                Intent::Clinico => Route::Clinico,
                Intent::Operacional => Route::Operacional(OperationalDetect {
                    is_operational: true,
                    urgency: Urgency::Normal,
                }),
                Intent::Finalizar if state.finish_reminder_sent => Route::Finalizar,
                Intent::Finalizar | Intent::Auxiliar | Intent::Indefinido => Route::Auxiliar,
            })
        }
        Err(AppError::LlmUnavailable(reason)) => {
            warn!(%reason, "intent classifier unavailable; falling back to help");
            Ok(Route::Auxiliar)
        }
        Err(err) => Err(err),
    }
}

/// Full confirmation resolution: deterministic matcher first, LLM
/// classifier as tiebreaker, `Unclear` when the provider is down.
async fn resolve_confirmation(engine: &Engine, text: &str) -> ConfirmationVerdict {
    if let Some(verdict) = deterministic_confirmation(text) {
        return verdict;
    }
    match engine.llm.classify_confirmation(text).await {
        Ok(verdict) => verdict,
        Err(err) => {
            warn!(%err, "confirmation classifier unavailable; treating as unclear");
            ConfirmationVerdict::Unclear
        }
    }
}

/// Operational-note detection with graceful degradation: when the
/// provider is down the gate simply does not fire.
async fn detect_operational(engine: &Engine, text: &str) -> Option<OperationalDetect> {
    match engine.llm.detect_operational_note(text).await {
        Ok(detect) => Some(detect),
        Err(err) => {
            warn!(%err, "operational detector unavailable; gate skipped");
            None
        }
    }
}
