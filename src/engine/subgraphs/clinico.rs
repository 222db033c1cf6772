//! Clinical subgraph.
//!
//! collecting → awaiting_commit_confirm → committed. Vitals accumulate
//! across messages; a full measurement is staged for confirmation, a
//! standalone note after the first complete measurement commits
//! directly.

use tracing::warn;

use crate::backend::types::{ClinicalDataRequest, ClinicalScenario};
use crate::clinical::extractor::{commit_readiness, CommitReadiness, DEFAULT_NOTE};
use crate::engine::subgraphs::{Reroute, SubgraphOutcome};
use crate::engine::Engine;
use crate::llm::types::ConfirmationVerdict;
use crate::models::outcome::OutcomeCode;
use crate::models::pending::{PendingAction, PendingFlow, PendingStatus};
use crate::models::session::{RespiratoryMode, SessionState, Vitals};
use crate::{AppError, Result};

/// Collect clinical fields from a caregiver message.
///
/// # Errors
///
/// Returns `AppError::Db` if a store write fails.
pub async fn collect(
    engine: &Engine,
    state: &mut SessionState,
    text: &str,
    message_id: &str,
) -> Result<SubgraphOutcome> {
    let extraction = engine.clinical.extract(&engine.llm, text).await?;
    if extraction.is_empty() && extraction.warnings.is_empty() {
        return Ok(SubgraphOutcome::reroute_to(
            OutcomeCode::HelpContext,
            Reroute::Auxiliar,
        ));
    }

    let note_only_message = extraction.vitals == Vitals::default()
        && extraction.respiratory_mode.is_none()
        && extraction.clinical_note.is_some();

    state.vitals.merge_missing(&extraction.vitals);
    if state.respiratory_mode.is_none() {
        state.respiratory_mode = extraction.respiratory_mode;
    }
    if state.clinical_note.is_none() {
        state.clinical_note.clone_from(&extraction.clinical_note);
    }

    match commit_readiness(state) {
        CommitReadiness::NoteOnly => commit_note_only(engine, state, message_id).await,
        CommitReadiness::Full => stage(engine, state).await,
        CommitReadiness::Missing(_) => {
            // A pure note before the first complete measurement cannot
            // commit on its own.
            if !state.first_complete_measurement_done
                && note_only_message
                && state.vitals == Vitals::default()
            {
                return Ok(SubgraphOutcome::done(
                    OutcomeCode::ClinicalRejectedIncompleteFirst,
                ));
            }
            Ok(SubgraphOutcome::done(OutcomeCode::ClinicalMissing))
        }
    }
}

/// Resolve a staged clinical commit with the caregiver's answer.
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
        ConfirmationVerdict::Unclear => Ok(SubgraphOutcome::done(OutcomeCode::ClinicalStaged)),
        ConfirmationVerdict::No | ConfirmationVerdict::Cancel => {
            // Buffer is kept; only the staged action goes away.
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
    let request: ClinicalDataRequest = serde_json::from_value(action.payload.clone())
        .map_err(|err| {
            AppError::Invariant(format!(
                "pending action {} payload is not a clinical record: {err}",
                action.action_id
            ))
        })?;

    match engine.backend.update_clinical_data(&request).await {
        Ok(()) => {
            if let Err(err) = engine
                .webhook
                .deliver_clinical(&state.session_id, &request)
                .await
            {
                warn!(%err, "clinical webhook delivery failed after backend commit");
            }
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

            state.first_complete_measurement_done = true;
            state.clear_clinical_buffer();
            state.resume_after = None;
            Ok(SubgraphOutcome::done(OutcomeCode::ClinicalCommitted))
        }
        Err(err @ (AppError::BackendTransient(_) | AppError::Timeout(_))) => {
            warn!(%err, "clinical commit failed transiently; action stays staged");
            Ok(SubgraphOutcome::done(OutcomeCode::ClinicalCommitFailed))
        }
        Err(err) => {
            warn!(%err, "clinical commit failed permanently; cancelling action");
            engine
                .pending
                .transition(
                    &state.session_id,
                    &action.action_id,
                    PendingStatus::Staged,
                    PendingStatus::Cancelled,
                )
                .await?;
            Ok(SubgraphOutcome::done(OutcomeCode::ClinicalCommitFailed))
        }
    }
}

async fn stage(engine: &Engine, state: &mut SessionState) -> Result<SubgraphOutcome> {
    if state.clinical_note.is_none() {
        // Optional after the first complete measurement.
        state.clinical_note = Some(DEFAULT_NOTE.to_string());
    }

    let mut action = PendingAction::new(
        &state.session_id,
        PendingFlow::ClinicalCommit,
        serde_json::Value::Null,
        "registrar medição completa de sinais vitais".to_string(),
    );
    let request = build_clinical_request(state, &action.action_id);
    action.payload = serde_json::to_value(&request)
        .map_err(|err| AppError::Invariant(format!("clinical record not json: {err}")))?;

    engine.pending.put(&action).await?;
    Ok(SubgraphOutcome::done(OutcomeCode::ClinicalStaged))
}

async fn commit_note_only(
    engine: &Engine,
    state: &mut SessionState,
    message_id: &str,
) -> Result<SubgraphOutcome> {
    let note = state.clinical_note.clone().unwrap_or_default();
    let request = ClinicalDataRequest {
        report_id: state.report_id.clone().unwrap_or_default(),
        report_date: state.report_date.clone().unwrap_or_default(),
        scenario: Some(ClinicalScenario::NoteOnly),
        caregiver_identifier: state.caregiver_id.clone(),
        patient_identifier: state.patient_id.clone(),
        clinical_note: Some(note),
        action_id: message_id.to_string(),
        ..ClinicalDataRequest::default()
    };

    match engine.backend.update_clinical_data(&request).await {
        Ok(()) => {
            if let Err(err) = engine
                .webhook
                .deliver_clinical(&state.session_id, &request)
                .await
            {
                warn!(%err, "note webhook delivery failed after backend commit");
            }
            state.clinical_note = None;
            Ok(SubgraphOutcome::done(OutcomeCode::ClinicalNoteOnlyCommitted))
        }
        Err(err) => {
            warn!(%err, "note-only commit failed; buffer kept");
            Ok(SubgraphOutcome::done(OutcomeCode::ClinicalCommitFailed))
        }
    }
}

/// Assemble the canonical clinical record from the session buffer.
fn build_clinical_request(state: &SessionState, action_id: &str) -> ClinicalDataRequest {
    let has_vitals = state.vitals.is_complete();
    let has_note = state.clinical_note.is_some();
    let supplementary = state.respiratory_mode.map(|mode| {
        matches!(
            mode,
            RespiratoryMode::SupplementalO2 | RespiratoryMode::MechanicalVentilation
        )
    });

    ClinicalDataRequest {
        report_id: state.report_id.clone().unwrap_or_default(),
        report_date: state.report_date.clone().unwrap_or_default(),
        scenario: Some(ClinicalScenario::from_parts(has_vitals, has_note, false)),
        caregiver_identifier: state.caregiver_id.clone(),
        patient_identifier: state.patient_id.clone(),
        heart_rate: state.vitals.hr,
        resp_rate: state.vitals.rr,
        saturation_o2: state.vitals.sat_o2,
        blood_pressure: state.vitals.pa.clone(),
        temperature: state.vitals.temp,
        supplementary_oxygen: supplementary,
        oxygen_volume: None,
        oxygen_concentrator: None,
        clinical_note: state.clinical_note.clone(),
        symptom_report: Vec::new(),
        action_id: action_id.to_string(),
    }
}
