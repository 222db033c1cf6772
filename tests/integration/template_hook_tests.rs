use shift_orchestrator::engine::pipeline::TemplateHints;
use shift_orchestrator::AppError;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::test_helpers::{mount_schedule, schedule_context, test_engine};

const PHONE: &str = "+5511933332222";
const SESSION: &str = "5511933332222";

#[tokio::test]
async fn finish_reminder_hint_flips_the_flag_under_the_lock() {
    let server = MockServer::start().await;
    mount_schedule(&server, schedule_context(true, "confirmado", false)).await;

    let engine = test_engine(&server).await;

    let session_id = engine
        .apply_template_hints(TemplateHints {
            phone_number: PHONE.into(),
            template: "fim_de_plantao".into(),
            finish_reminder_sent: Some(true),
            shift_day: None,
            missing_fields_hint: None,
        })
        .await
        .expect("apply hints");
    assert_eq!(session_id, SESSION);

    let (state, version) = engine
        .sessions()
        .peek(SESSION)
        .await
        .expect("peek")
        .expect("session exists");
    assert!(state.finish_reminder_sent);
    assert_eq!(version, 1);

    // The hint event lands in the conversation buffer for audit.
    let buffer = engine
        .conversation_buffer()
        .read(SESSION, None, 10, false)
        .await
        .expect("read buffer");
    assert!(buffer.iter().any(|e| e.message_id == "template_fired"));
}

#[tokio::test]
async fn changed_shift_day_triggers_rehydration() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/getScheduleStarted"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(schedule_context(true, "aguardando resposta", false)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let engine = test_engine(&server).await;

    // Seed the session on one shift day.
    engine
        .apply_template_hints(TemplateHints {
            phone_number: PHONE.into(),
            template: "novo_plantao".into(),
            finish_reminder_sent: None,
            shift_day: Some("2025-05-10".into()),
            missing_fields_hint: None,
        })
        .await
        .expect("first hints");

    // A different day signals a new shift and re-hydrates.
    engine
        .apply_template_hints(TemplateHints {
            phone_number: PHONE.into(),
            template: "novo_plantao".into(),
            finish_reminder_sent: None,
            shift_day: Some("2025-05-11".into()),
            missing_fields_hint: None,
        })
        .await
        .expect("second hints");
}

#[tokio::test]
async fn hook_respects_the_session_lock() {
    let server = MockServer::start().await;
    mount_schedule(&server, schedule_context(true, "confirmado", false)).await;

    let engine = test_engine(&server).await;

    assert!(engine
        .locks()
        .acquire(SESSION, "another-worker:1", 60_000)
        .await
        .expect("foreign lock"));

    let err = engine
        .apply_template_hints(TemplateHints {
            phone_number: PHONE.into(),
            template: "fim_de_plantao".into(),
            finish_reminder_sent: Some(true),
            shift_day: None,
            missing_fields_hint: None,
        })
        .await
        .expect_err("lock denied");
    assert!(matches!(err, AppError::LockDenied(_)), "got {err:?}");
}
