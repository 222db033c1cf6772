//! Per-flow state machines.
//!
//! Each subgraph either finalizes the turn with an outcome code or
//! requests one re-route within the same turn; the pipeline enforces
//! the single-hop bound.

pub mod auxiliar;
pub mod clinico;
pub mod escala;
pub mod finalizar;
pub mod operacional;

use crate::engine::router::Route;
use crate::engine::Engine;
use crate::models::outcome::OutcomeCode;
use crate::models::pending::PendingFlow;
use crate::models::session::SessionState;
use crate::Result;

/// Re-route target a subgraph may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reroute {
    /// Hand the turn to the help flow.
    Auxiliar,
}

/// What a subgraph produced for the turn.
#[derive(Debug)]
pub struct SubgraphOutcome {
    /// Outcome code for the consolidator.
    pub outcome: OutcomeCode,
    /// Optional single re-route within the turn.
    pub reroute: Option<Reroute>,
}

impl SubgraphOutcome {
    /// Finalize the turn with `outcome`.
    #[must_use]
    pub fn done(outcome: OutcomeCode) -> Self {
        Self {
            outcome,
            reroute: None,
        }
    }

    /// Request a re-route; `outcome` stands if the hop budget is spent.
    #[must_use]
    pub fn reroute_to(outcome: OutcomeCode, target: Reroute) -> Self {
        Self {
            outcome,
            reroute: Some(target),
        }
    }
}

/// Per-turn memo surviving OCC replays.
///
/// Operational delivery is idempotent on the webhook side, so a replay
/// after an OCC conflict must not re-deliver.
#[derive(Debug, Default)]
pub struct TurnMemo {
    /// The operational webhook already received this message.
    pub operational_delivered: bool,
}

/// Dispatch the routed subgraph.
///
/// # Errors
///
/// Propagates persistence failures; business failures are folded into
/// outcome codes by the subgraphs themselves.
pub async fn dispatch(
    engine: &Engine,
    state: &mut SessionState,
    route: Route,
    text: &str,
    message_id: &str,
    memo: &mut TurnMemo,
) -> Result<SubgraphOutcome> {
    match route {
        Route::Escala => escala::handle(engine, state, text).await,
        Route::Clinico => clinico::collect(engine, state, text, message_id).await,
        Route::Operacional(detect) => {
            operacional::handle(engine, state, text, message_id, detect.urgency, memo).await
        }
        Route::Finalizar => finalizar::handle(engine, state, text).await,
        Route::Auxiliar => Ok(auxiliar::handle(state)),
        Route::PendingConfirmation(action, verdict) => match action.flow {
            PendingFlow::EscalaCommit => {
                escala::resolve(engine, state, &action, verdict).await
            }
            PendingFlow::ClinicalCommit => {
                clinico::resolve(engine, state, &action, verdict).await
            }
            PendingFlow::FinalizeCommit => {
                finalizar::resolve(engine, state, &action, verdict).await
            }
        },
    }
}
