//! Operational note subgraph.
//!
//! Single-shot: no staging. Delivery failures never block other flows,
//! and an OCC replay never re-delivers (the turn memo records the
//! delivery).

use serde_json::json;
use tracing::warn;

use crate::engine::subgraphs::{SubgraphOutcome, TurnMemo};
use crate::engine::Engine;
use crate::llm::types::Urgency;
use crate::models::outcome::OutcomeCode;
use crate::models::session::SessionState;
use crate::Result;

/// Deliver an operational note to the workflow webhook.
///
/// # Errors
///
/// Never fails: delivery failures surface as an outcome code.
pub async fn handle(
    engine: &Engine,
    state: &SessionState,
    text: &str,
    message_id: &str,
    urgency: Urgency,
    memo: &mut TurnMemo,
) -> Result<SubgraphOutcome> {
    if memo.operational_delivered {
        return Ok(SubgraphOutcome::done(OutcomeCode::OperationalDelivered));
    }

    let session_context = json!({
        "scheduleId": state.schedule_id,
        "patientId": state.patient_id,
        "caregiverId": state.caregiver_id,
        "shiftDay": state.shift_day,
    });

    match engine
        .webhook
        .deliver_operational(&state.session_id, message_id, text, urgency, &session_context)
        .await
    {
        Ok(()) => {
            memo.operational_delivered = true;
            Ok(SubgraphOutcome::done(OutcomeCode::OperationalDelivered))
        }
        Err(err) => {
            warn!(%err, "operational note delivery failed");
            Ok(SubgraphOutcome::done(OutcomeCode::OperationalDeliveryFailed))
        }
    }
}
