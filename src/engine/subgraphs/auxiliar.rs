//! Help subgraph. Stateless.

use crate::engine::subgraphs::SubgraphOutcome;
use crate::models::outcome::OutcomeCode;
use crate::models::session::{SessionState, Vitals};

/// Produce a help outcome, contextual when the session is missing
/// something actionable.
#[must_use]
pub fn handle(state: &SessionState) -> SubgraphOutcome {
    let has_partial_vitals =
        state.vitals != Vitals::default() && !state.vitals.is_complete();
    let has_pending_topics =
        state.finish_reminder_sent && !state.finalization_topics.is_complete();

    if state.schedule_id.is_none() || has_partial_vitals || has_pending_topics {
        SubgraphOutcome::done(OutcomeCode::HelpContext)
    } else {
        SubgraphOutcome::done(OutcomeCode::HelpGeneric)
    }
}
