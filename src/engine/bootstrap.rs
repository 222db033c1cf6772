//! Session hydration from the backend.
//!
//! On the first message of a session, or when a template event signals
//! a new shift, the shift context is fetched from `getScheduleStarted`
//! and merged into the state. Failures degrade gracefully: the session
//! proceeds without a shift and the help flow reports it.

use tracing::{info, warn};

use crate::backend::types::ScheduleContext;
use crate::engine::Engine;
use crate::models::session::{SessionState, ShiftResponse};

/// Whether the loaded state still needs hydration.
#[must_use]
pub fn needs_hydration(state: &SessionState, version: i64) -> bool {
    version == 0 || state.schedule_id.is_none()
}

/// Fetch the shift context and merge it into the state.
///
/// Returns `false` when the backend could not identify a shift; the
/// caller proceeds in help mode.
pub async fn hydrate(engine: &Engine, state: &mut SessionState) -> bool {
    match engine.backend.get_schedule_started(&state.phone_number).await {
        Ok(context) => {
            merge_schedule_context(state, &context);
            info!(
                session_id = %state.session_id,
                schedule_id = ?state.schedule_id,
                "session hydrated from backend"
            );
            state.schedule_id.is_some()
        }
        Err(err) => {
            warn!(session_id = %state.session_id, %err, "hydration failed");
            false
        }
    }
}

/// Merge a fetched shift context into the session state.
pub fn merge_schedule_context(state: &mut SessionState, context: &ScheduleContext) {
    state.schedule_id.clone_from(&context.schedule_id);
    state.patient_id.clone_from(&context.patient_id);
    state.patient_name.clone_from(&context.patient_name);
    state.report_id.clone_from(&context.report_id);
    state.report_date.clone_from(&context.report_date);
    state.shift_day.clone_from(&context.shift_day);
    state.shift_start.clone_from(&context.shift_start);
    state.shift_end.clone_from(&context.shift_end);
    state.shift_allow = context.shift_allow;
    state.response = parse_response(context.response.as_deref().unwrap_or(""));
    state.schedule_started = context.schedule_started;
    state.finish_reminder_sent = context.finish_reminder_sent;
    if context.caregiver_id.is_some() {
        state.caregiver_id.clone_from(&context.caregiver_id);
    }
    if context.caregiver_name.is_some() {
        state.caregiver_name.clone_from(&context.caregiver_name);
    }
    if context.company.is_some() {
        state.company.clone_from(&context.company);
    }
    if context.cooperative.is_some() {
        state.cooperative.clone_from(&context.cooperative);
    }
}

/// Parse the backend's attendance response string.
#[must_use]
pub fn parse_response(raw: &str) -> ShiftResponse {
    match raw.trim().to_lowercase().as_str() {
        "confirmado" => ShiftResponse::Confirmado,
        "aguardando resposta" => ShiftResponse::AguardandoResposta,
        "cancelado" => ShiftResponse::Cancelado,
        _ => ShiftResponse::Empty,
    }
}
