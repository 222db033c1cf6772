//! Finalization subgraph.
//!
//! Active while `finish_reminder_sent` is set. Collects the eight
//! report topics incrementally, posts each newly filled topic to the
//! workflow webhook, stages the summary when complete and executes it
//! on confirmation.

use tracing::warn;

use crate::backend::types::SummaryRequest;
use crate::engine::subgraphs::SubgraphOutcome;
use crate::engine::{bootstrap, Engine};
use crate::llm::types::{ConfirmationVerdict, TopicExtract};
use crate::models::outcome::OutcomeCode;
use crate::models::pending::{PendingAction, PendingFlow, PendingStatus};
use crate::models::session::{FinalizationTopics, SessionState};
use crate::{AppError, Result};

/// Collect finalization topics from a caregiver message.
///
/// # Errors
///
/// Returns `AppError::Db` if a store write fails.
pub async fn handle(
    engine: &Engine,
    state: &mut SessionState,
    text: &str,
) -> Result<SubgraphOutcome> {
    let seeded_text = seed_context(engine, state, text).await;

    let filled: Vec<&str> = FinalizationTopics::LABELS
        .iter()
        .copied()
        .filter(|label| state.finalization_topics.get(label).is_some())
        .collect();

    match engine
        .llm
        .extract_finalization_topics(&seeded_text, &filled)
        .await
    {
        Ok(extract) => {
            let partial = into_topics(extract);
            let newly = state.finalization_topics.merge_missing(&partial);
            let report_id = state.report_id.clone().unwrap_or_default();
            for label in newly {
                if let Some(value) = state.finalization_topics.get(label) {
                    if let Err(err) = engine
                        .webhook
                        .deliver_topic(&state.session_id, &report_id, label, value)
                        .await
                    {
                        warn!(%err, topic = label, "topic webhook delivery failed");
                    }
                }
            }
        }
        Err(AppError::LlmUnavailable(reason)) => {
            warn!(%reason, "topic extractor unavailable; re-asking");
        }
        Err(err) => return Err(err),
    }

    if state.finalization_topics.is_complete() {
        stage(engine, state).await
    } else {
        Ok(SubgraphOutcome::done(OutcomeCode::FinalizeTopicCollected))
    }
}

/// Resolve a staged finalize commit with the caregiver's answer.
///
/// # Errors
///
/// Returns `AppError::Db` if a pending transition fails and
/// `AppError::Invariant` if the staged payload does not parse.
pub async fn resolve(
    engine: &Engine,
    state: &mut SessionState,
    action: &PendingAction,
    verdict: ConfirmationVerdict,
) -> Result<SubgraphOutcome> {
    match verdict {
        ConfirmationVerdict::Unclear => Ok(SubgraphOutcome::done(OutcomeCode::FinalizeStaged)),
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
            Ok(SubgraphOutcome::done(OutcomeCode::HelpContext))
        }
        ConfirmationVerdict::Yes => execute(engine, state, action).await,
    }
}

async fn execute(
    engine: &Engine,
    state: &mut SessionState,
    action: &PendingAction,
) -> Result<SubgraphOutcome> {
    let request: SummaryRequest =
        serde_json::from_value(action.payload.clone()).map_err(|err| {
            AppError::Invariant(format!(
                "pending action {} payload is not a summary: {err}",
                action.action_id
            ))
        })?;

    match engine.backend.update_report_summary(&request).await {
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

            state.clear_after_finalize();
            // Re-seed so the next message sees the fresh shift context.
            bootstrap::hydrate(engine, state).await;
            Ok(SubgraphOutcome::done(OutcomeCode::FinalizeCommitted))
        }
        Err(err @ (AppError::BackendTransient(_) | AppError::Timeout(_))) => {
            warn!(%err, "finalize commit failed transiently; action stays staged");
            Ok(SubgraphOutcome::done(OutcomeCode::FinalizeCommitFailed))
        }
        Err(err) => {
            warn!(%err, "finalize commit failed permanently; cancelling action");
            engine
                .pending
                .transition(
                    &state.session_id,
                    &action.action_id,
                    PendingStatus::Staged,
                    PendingStatus::Cancelled,
                )
                .await?;
            Ok(SubgraphOutcome::done(OutcomeCode::FinalizeCommitFailed))
        }
    }
}

async fn stage(engine: &Engine, state: &mut SessionState) -> Result<SubgraphOutcome> {
    let mut action = PendingAction::new(
        &state.session_id,
        PendingFlow::FinalizeCommit,
        serde_json::Value::Null,
        "enviar relatório final do plantão".to_string(),
    );
    let request = build_summary_request(state, &action.action_id);
    action.payload = serde_json::to_value(&request)
        .map_err(|err| AppError::Invariant(format!("summary payload not json: {err}")))?;

    engine.pending.put(&action).await?;
    Ok(SubgraphOutcome::done(OutcomeCode::FinalizeStaged))
}

/// On the first finalization message of a session, fetch the shift's
/// existing notes so the extractor sees what was already recorded.
async fn seed_context(engine: &Engine, state: &SessionState, text: &str) -> String {
    if state.finalization_topics != FinalizationTopics::default() {
        return text.to_string();
    }
    let (Some(report_id), Some(report_date)) =
        (state.report_id.as_deref(), state.report_date.as_deref())
    else {
        return text.to_string();
    };

    match engine.backend.get_note_report(report_id, report_date).await {
        Ok(report) if !report.notes.is_empty() => {
            let notes: Vec<&str> = report.notes.iter().map(|n| n.note_desc.as_str()).collect();
            format!("Notas já registradas no plantão: {}\nMensagem: {text}", notes.join("; "))
        }
        Ok(_) => text.to_string(),
        Err(err) => {
            warn!(%err, "note report fetch failed; proceeding without seed");
            text.to_string()
        }
    }
}

fn into_topics(extract: TopicExtract) -> FinalizationTopics {
    FinalizationTopics {
        alimentacao: extract.alimentacao,
        evacuacoes: extract.evacuacoes,
        sono: extract.sono,
        humor: extract.humor,
        medicacoes: extract.medicacoes,
        atividades: extract.atividades,
        adicional_clinico: extract.adicional_clinico,
        adicional_administrativo: extract.adicional_administrativo,
    }
}

/// Assemble the summary payload from the collected topics.
fn build_summary_request(state: &SessionState, action_id: &str) -> SummaryRequest {
    let topics = &state.finalization_topics;
    let first_name = |name: &Option<String>| {
        name.as_deref()
            .and_then(|n| n.split_whitespace().next())
            .unwrap_or_default()
            .to_string()
    };

    SummaryRequest {
        report_id: state.report_id.clone().unwrap_or_default(),
        report_date: state.report_date.clone().unwrap_or_default(),
        schedule_id: state.schedule_id.clone().unwrap_or_default(),
        patient_first_name: first_name(&state.patient_name),
        shift_day: state.shift_day.clone().unwrap_or_default(),
        shift_start: state.shift_start.clone().unwrap_or_default(),
        shift_end: state.shift_end.clone().unwrap_or_default(),
        caregiver_first_name: first_name(&state.caregiver_name),
        caregiver_id: state.caregiver_id.clone().unwrap_or_default(),
        food_hydration_specification: topics.alimentacao.clone().unwrap_or_default(),
        stool_urine_specification: topics.evacuacoes.clone().unwrap_or_default(),
        sleep_specification: topics.sono.clone().unwrap_or_default(),
        mood_specification: topics.humor.clone().unwrap_or_default(),
        medications_specification: topics.medicacoes.clone().unwrap_or_default(),
        activities_specification: topics.atividades.clone().unwrap_or_default(),
        additional_information_specification: topics.adicional_clinico.clone().unwrap_or_default(),
        administrative_info: topics.adicional_administrativo.clone().unwrap_or_default(),
        action_id: action_id.to_string(),
    }
}
