use shift_orchestrator::clinical::extractor::{
    commit_readiness, ClinicalExtractor, CommitReadiness,
};
use shift_orchestrator::clinical::validator::WARN_PA_AMBIGUOUS;
use shift_orchestrator::models::session::{RespiratoryMode, SessionState, Vitals};

fn extractor() -> ClinicalExtractor {
    ClinicalExtractor::new().expect("patterns compile")
}

#[test]
fn deterministic_pass_reads_pa_only_message() {
    let extraction = extractor().deterministic_pass("PA 120x80");
    assert_eq!(extraction.vitals.pa.as_deref(), Some("120x80"));
    assert!(extraction.vitals.hr.is_none());
    assert!(extraction.clinical_note.is_none());
}

#[test]
fn deterministic_pass_reads_hr_and_sat() {
    let extraction = extractor().deterministic_pass("FC 78, Sat 97%");
    assert_eq!(extraction.vitals.hr, Some(78));
    assert_eq!(extraction.vitals.sat_o2, Some(97));
    assert!(extraction.vitals.pa.is_none());
}

#[test]
fn deterministic_pass_reads_the_full_tail_with_mode_and_note() {
    let extraction =
        extractor().deterministic_pass("FR 18, Temp 36.8, ar ambiente, paciente estável");
    assert_eq!(extraction.vitals.rr, Some(18));
    assert_eq!(extraction.vitals.temp, Some(36.8));
    assert_eq!(extraction.respiratory_mode, Some(RespiratoryMode::Ambient));
    assert_eq!(extraction.clinical_note.as_deref(), Some("paciente estável"));
}

#[test]
fn deterministic_pass_accepts_comma_decimal_temperature() {
    let extraction = extractor().deterministic_pass("temperatura 36,5");
    assert_eq!(extraction.vitals.temp, Some(36.5));
}

#[test]
fn ambiguous_pa_yields_warning_and_no_value() {
    let extraction = extractor().deterministic_pass("PA 12/8");
    assert!(extraction.vitals.pa.is_none());
    assert!(extraction.warnings.iter().any(|w| w == WARN_PA_AMBIGUOUS));
}

#[test]
fn sat_mention_does_not_read_as_supplemental_oxygen() {
    let extraction = extractor().deterministic_pass("saturação de O2 97, ar ambiente");
    assert_eq!(extraction.vitals.sat_o2, Some(97));
    assert_eq!(extraction.respiratory_mode, Some(RespiratoryMode::Ambient));
}

#[test]
fn plain_text_yields_nothing_deterministically() {
    let extraction = extractor().deterministic_pass("o paciente dormiu bem a noite toda");
    assert!(extraction.is_empty());
    assert!(extraction.warnings.is_empty());
}

fn full_buffer(state: &mut SessionState) {
    state.vitals = Vitals {
        pa: Some("120x80".into()),
        hr: Some(78),
        rr: Some(18),
        sat_o2: Some(97),
        temp: Some(36.8),
    };
    state.respiratory_mode = Some(RespiratoryMode::Ambient);
}

#[test]
fn first_measurement_requires_the_note_too() {
    let mut state = SessionState::new("5511999990000");
    full_buffer(&mut state);

    match commit_readiness(&state) {
        CommitReadiness::Missing(labels) => {
            assert!(labels.iter().any(|l| l.contains("evolução")));
        }
        other => panic!("expected missing, got {other:?}"),
    }

    state.clinical_note = Some("paciente estável".into());
    assert_eq!(commit_readiness(&state), CommitReadiness::Full);
}

#[test]
fn after_first_measurement_the_note_is_optional() {
    let mut state = SessionState::new("5511999990000");
    state.first_complete_measurement_done = true;
    full_buffer(&mut state);

    assert_eq!(commit_readiness(&state), CommitReadiness::Full);
}

#[test]
fn standalone_note_commits_only_after_first_measurement() {
    let mut state = SessionState::new("5511999990000");
    state.clinical_note = Some("dormiu bem".into());

    assert!(matches!(
        commit_readiness(&state),
        CommitReadiness::Missing(_)
    ));

    state.first_complete_measurement_done = true;
    assert_eq!(commit_readiness(&state), CommitReadiness::NoteOnly);
}

#[test]
fn partial_vitals_list_the_missing_subset() {
    let mut state = SessionState::new("5511999990000");
    state.vitals.pa = Some("120x80".into());
    state.vitals.hr = Some(78);

    match commit_readiness(&state) {
        CommitReadiness::Missing(labels) => {
            assert!(labels.contains(&"FR".to_string()));
            assert!(labels.contains(&"SatO2".to_string()));
            assert!(labels.contains(&"Temp".to_string()));
            assert!(!labels.contains(&"PA".to_string()));
            assert!(!labels.contains(&"FC".to_string()));
        }
        other => panic!("expected missing, got {other:?}"),
    }
}

#[test]
fn merge_fills_nulls_without_overwriting() {
    let mut vitals = Vitals {
        pa: Some("120x80".into()),
        ..Vitals::default()
    };
    let incoming = Vitals {
        pa: Some("999x999".into()),
        hr: Some(78),
        ..Vitals::default()
    };

    vitals.merge_missing(&incoming);
    assert_eq!(vitals.pa.as_deref(), Some("120x80"));
    assert_eq!(vitals.hr, Some(78));
}
