//! Fiscal consolidator: one caregiver-facing reply per message.
//!
//! The reply comes from the LLM keyed on state + outcome code, with a
//! deterministic PT-BR template per code as the fallback. A lexicon
//! guard blocks finalization vocabulary while the shift is not flagged
//! ready to close.

use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

use crate::engine::Engine;
use crate::models::outcome::OutcomeCode;
use crate::models::session::SessionState;

/// Finalization vocabulary forbidden while `finish_reminder_sent` is
/// false.
#[allow(clippy::expect_used)] // constant pattern
fn finalization_lexicon() -> &'static Regex {
    static LEXICON: OnceLock<Regex> = OnceLock::new();
    LEXICON.get_or_init(|| {
        Regex::new(r"(?i)finaliza\w*|encerr\w*|fechamento|relat[óo]rio final")
            .expect("lexicon pattern compiles")
    })
}

/// Whether `outcome` belongs to the finalization flow, where closing
/// vocabulary is the point.
fn is_finalize_outcome(outcome: OutcomeCode) -> bool {
    matches!(
        outcome,
        OutcomeCode::FinalizeTopicCollected
            | OutcomeCode::FinalizeStaged
            | OutcomeCode::FinalizeCommitted
            | OutcomeCode::FinalizeCommitFailed
    )
}

/// Produce the reply for a turn.
///
/// Falls back to the deterministic template when the provider is
/// unavailable or the generated text violates the lexicon guard.
pub async fn consolidate(engine: &Engine, state: &SessionState, outcome: OutcomeCode) -> String {
    if outcome.is_terminal_error() {
        return template(state, outcome);
    }

    match engine.llm.generate_reply(state, outcome, "pt-BR").await {
        Ok(reply) => {
            if violates_guard(state, outcome, &reply) {
                warn!(
                    outcome = %outcome,
                    "generated reply violated finalization guard; using template"
                );
                template(state, outcome)
            } else {
                reply
            }
        }
        Err(err) => {
            warn!(%err, "reply generation unavailable; using template");
            template(state, outcome)
        }
    }
}

/// Lexicon guard: no finalization vocabulary while the backend has not
/// flagged the shift ready to close.
#[must_use]
pub fn violates_guard(state: &SessionState, outcome: OutcomeCode, reply: &str) -> bool {
    !state.finish_reminder_sent
        && !is_finalize_outcome(outcome)
        && finalization_lexicon().is_match(reply)
}

/// Deterministic PT-BR template per outcome code.
#[must_use]
pub fn template(state: &SessionState, outcome: OutcomeCode) -> String {
    match outcome {
        OutcomeCode::EscalaStaged => {
            "Você confirma sua resposta de presença no plantão? Responda sim ou não.".to_string()
        }
        OutcomeCode::EscalaConfirmed => match state.response {
            crate::models::session::ShiftResponse::Cancelado => {
                "Ausência registrada. A equipe de coordenação foi avisada.".to_string()
            }
            _ => "Presença confirmada. Bom plantão!".to_string(),
        },
        OutcomeCode::EscalaCancelled => {
            "Tudo bem, nada foi registrado. Quando puder, confirme sua presença.".to_string()
        }
        OutcomeCode::EscalaCommitFailed => {
            "Não consegui registrar sua resposta agora. Tente novamente em instantes.".to_string()
        }
        OutcomeCode::ClinicalMissing => {
            let missing = clinical_missing_labels(state);
            format!("Anotado! Ainda faltam: {missing}.")
        }
        OutcomeCode::ClinicalStaged => {
            "Recebi todos os dados da medição. Confirma o registro? Responda sim ou não."
                .to_string()
        }
        OutcomeCode::ClinicalCommitted => "Dados clínicos registrados com sucesso.".to_string(),
        OutcomeCode::ClinicalNoteOnlyCommitted => {
            "Evolução registrada com sucesso.".to_string()
        }
        OutcomeCode::ClinicalRejectedIncompleteFirst => {
            let missing = clinical_missing_labels(state);
            format!(
                "Para a primeira medição completa preciso de todos os sinais vitais, do modo \
                 respiratório e da evolução do paciente. Ainda faltam: {missing}."
            )
        }
        OutcomeCode::ClinicalCommitFailed => {
            "Não consegui salvar os dados clínicos agora. Eles foram mantidos; tente novamente \
             em instantes."
                .to_string()
        }
        OutcomeCode::OperationalDelivered => {
            "Recado operacional encaminhado à equipe. Obrigado pelo aviso!".to_string()
        }
        OutcomeCode::OperationalDeliveryFailed => {
            "Não consegui encaminhar o recado agora. Tente novamente em instantes.".to_string()
        }
        OutcomeCode::FinalizeTopicCollected => {
            let next = state
                .finalization_topics
                .missing()
                .first()
                .map_or("nenhum", |label| topic_label(label));
            format!("Anotado! Agora me conte sobre: {next}.")
        }
        OutcomeCode::FinalizeStaged => {
            "Todos os tópicos foram coletados. Confirma o envio do relatório final? Responda \
             sim ou não."
                .to_string()
        }
        OutcomeCode::FinalizeCommitted => {
            "Relatório enviado com sucesso. Obrigado pelo plantão e bom descanso!".to_string()
        }
        OutcomeCode::FinalizeCommitFailed => {
            "Não consegui enviar o relatório agora. Tente novamente em instantes.".to_string()
        }
        OutcomeCode::HelpGeneric => {
            "Posso ajudar com a presença no plantão, o registro de dados clínicos do paciente e \
             recados operacionais. Como posso ajudar?"
                .to_string()
        }
        OutcomeCode::HelpContext => help_context(state),
        OutcomeCode::Busy => {
            "Ainda estou processando sua mensagem anterior. Aguarde um instante e envie \
             novamente."
                .to_string()
        }
        OutcomeCode::Timeout => {
            "Demorei mais do que o esperado para processar. Envie novamente, por favor."
                .to_string()
        }
        OutcomeCode::Conflict => {
            "Não consegui concluir o registro agora. Tente novamente, por favor.".to_string()
        }
        OutcomeCode::InputError => "Desculpe, não entendi. Pode repetir?".to_string(),
    }
}

fn clinical_missing_labels(state: &SessionState) -> String {
    let mut labels: Vec<String> =
        state.vitals.missing().into_iter().map(String::from).collect();
    if state.respiratory_mode.is_none() {
        labels.push("modo respiratório".to_string());
    }
    if !state.first_complete_measurement_done && state.clinical_note.is_none() {
        labels.push("evolução do paciente".to_string());
    }
    if labels.is_empty() {
        "nenhum campo".to_string()
    } else {
        labels.join(", ")
    }
}

fn help_context(state: &SessionState) -> String {
    if state.schedule_id.is_none() {
        return "Não identifiquei um plantão ativo para este número. Verifique com a \
                coordenação se a escala foi publicada."
            .to_string();
    }
    if state.vitals != crate::models::session::Vitals::default() && !state.vitals.is_complete() {
        let missing = clinical_missing_labels(state);
        return format!("Posso continuar o registro clínico. Ainda faltam: {missing}.");
    }
    if state.finish_reminder_sent && !state.finalization_topics.is_complete() {
        let next = state
            .finalization_topics
            .missing()
            .first()
            .map_or("nenhum", |label| topic_label(label));
        return format!("Vamos continuar o relatório. Me conte sobre: {next}.");
    }
    "Certo! Se precisar, posso registrar dados clínicos ou encaminhar recados à equipe."
        .to_string()
}

/// Caregiver-facing wording for a topic label.
fn topic_label(label: &str) -> &'static str {
    match label {
        "alimentacao" => "alimentação e hidratação",
        "evacuacoes" => "evacuações e diurese",
        "sono" => "sono",
        "humor" => "humor",
        "medicacoes" => "medicações",
        "atividades" => "atividades realizadas",
        "adicional_clinico" => "informações clínicas adicionais",
        _ => "informações administrativas",
    }
}
