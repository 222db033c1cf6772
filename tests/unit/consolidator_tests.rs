use shift_orchestrator::engine::consolidator::{template, violates_guard};
use shift_orchestrator::models::outcome::OutcomeCode;
use shift_orchestrator::models::session::SessionState;

const NON_FINALIZE_OUTCOMES: [OutcomeCode; 18] = [
    OutcomeCode::EscalaStaged,
    OutcomeCode::EscalaConfirmed,
    OutcomeCode::EscalaCancelled,
    OutcomeCode::EscalaCommitFailed,
    OutcomeCode::ClinicalMissing,
    OutcomeCode::ClinicalStaged,
    OutcomeCode::ClinicalCommitted,
    OutcomeCode::ClinicalNoteOnlyCommitted,
    OutcomeCode::ClinicalRejectedIncompleteFirst,
    OutcomeCode::ClinicalCommitFailed,
    OutcomeCode::OperationalDelivered,
    OutcomeCode::OperationalDeliveryFailed,
    OutcomeCode::HelpGeneric,
    OutcomeCode::HelpContext,
    OutcomeCode::Busy,
    OutcomeCode::Timeout,
    OutcomeCode::Conflict,
    OutcomeCode::InputError,
];

#[test]
fn templates_never_mention_finalization_before_the_reminder() {
    let state = SessionState::new("5511999990000");
    assert!(!state.finish_reminder_sent);

    for outcome in NON_FINALIZE_OUTCOMES {
        let reply = template(&state, outcome);
        assert!(
            !violates_guard(&state, outcome, &reply),
            "template for {outcome} violates the finalization guard: {reply}"
        );
    }
}

#[test]
fn guard_blocks_generated_finalization_vocabulary() {
    let state = SessionState::new("5511999990000");

    assert!(violates_guard(
        &state,
        OutcomeCode::HelpGeneric,
        "Vamos finalizar o plantão agora?"
    ));
    assert!(violates_guard(
        &state,
        OutcomeCode::ClinicalStaged,
        "Depois disso faremos o encerramento."
    ));
    assert!(!violates_guard(
        &state,
        OutcomeCode::HelpGeneric,
        "Posso registrar os sinais vitais."
    ));
}

#[test]
fn guard_relaxes_once_the_reminder_is_sent() {
    let mut state = SessionState::new("5511999990000");
    state.finish_reminder_sent = true;

    assert!(!violates_guard(
        &state,
        OutcomeCode::HelpContext,
        "Vamos finalizar o plantão?"
    ));
}

#[test]
fn clinical_missing_template_lists_only_the_missing_subset() {
    let mut state = SessionState::new("5511999990000");
    state.vitals.pa = Some("120x80".into());
    state.vitals.hr = Some(78);

    let reply = template(&state, OutcomeCode::ClinicalMissing);
    assert!(reply.contains("FR"));
    assert!(reply.contains("SatO2"));
    assert!(reply.contains("Temp"));
    assert!(!reply.contains("PA"));
    assert!(!reply.contains("FC"));
}

#[test]
fn finalize_topic_template_names_the_next_missing_topic() {
    let mut state = SessionState::new("5511999990000");
    state.finish_reminder_sent = true;
    state.finalization_topics.alimentacao = Some("comeu bem".into());

    let reply = template(&state, OutcomeCode::FinalizeTopicCollected);
    assert!(reply.contains("evacuações"));
}

#[test]
fn help_context_names_the_missing_shift() {
    let state = SessionState::new("5511999990000");
    let reply = template(&state, OutcomeCode::HelpContext);
    assert!(reply.contains("plantão ativo"));
}
