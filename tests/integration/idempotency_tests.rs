use shift_orchestrator::engine::pipeline::InboundMessage;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::test_helpers::{parse_body, schedule_context, test_engine};

const PHONE: &str = "+5511955554444";
const SESSION: &str = "5511955554444";

fn keyed_msg(message_id: &str, key: &str, text: &str) -> InboundMessage {
    InboundMessage {
        message_id: message_id.into(),
        phone_number: PHONE.into(),
        text: text.into(),
        idempotency_key: Some(key.into()),
        meta: None,
    }
}

#[tokio::test]
async fn replay_returns_byte_identical_body_and_one_side_effect() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/getScheduleStarted"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(schedule_context(true, "aguardando resposta", false)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let engine = test_engine(&server).await;

    let (first_status, first_body) = engine
        .process_message(keyed_msg("m1", "k-42", "cheguei"))
        .await;
    assert_eq!(first_status, 200);
    assert_eq!(parse_body(&first_body)["outcomeCode"], "escala_staged");

    // Redelivery with the same key: identical bytes, no new hydration,
    // no second staging.
    let (second_status, second_body) = engine
        .process_message(keyed_msg("m2", "k-42", "cheguei"))
        .await;
    assert_eq!(second_status, first_status);
    assert_eq!(second_body, first_body);

    let staged = engine
        .pending_actions()
        .get_staged(SESSION)
        .await
        .expect("get staged")
        .expect("one staged action");
    let buffer = engine
        .conversation_buffer()
        .read(SESSION, None, 50, false)
        .await
        .expect("read buffer");
    assert_eq!(
        buffer.iter().filter(|e| e.text == "cheguei").count(),
        1,
        "replay must not re-append the message"
    );
    drop(staged);
}

#[tokio::test]
async fn message_id_is_the_default_idempotency_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/getScheduleStarted"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(schedule_context(true, "aguardando resposta", false)),
        )
        .mount(&server)
        .await;

    let engine = test_engine(&server).await;

    let plain = |text: &str| InboundMessage {
        message_id: "m-same".into(),
        phone_number: PHONE.into(),
        text: text.into(),
        idempotency_key: None,
        meta: None,
    };

    let (_, first_body) = engine.process_message(plain("cheguei")).await;
    let (_, second_body) = engine.process_message(plain("cheguei")).await;
    assert_eq!(second_body, first_body);
}

#[tokio::test]
async fn blank_text_is_an_input_error_that_advances_nothing() {
    let server = MockServer::start().await;
    let engine = test_engine(&server).await;

    let (status, body) = engine
        .process_message(InboundMessage {
            message_id: "m1".into(),
            phone_number: PHONE.into(),
            text: "   ".into(),
            idempotency_key: None,
            meta: None,
        })
        .await;
    assert_eq!(status, 200);
    let parsed = parse_body(&body);
    assert_eq!(parsed["status"], "error");
    assert_eq!(parsed["outcomeCode"], "input_error");

    assert!(
        engine.sessions().peek(SESSION).await.expect("peek").is_none(),
        "input errors must not create session state"
    );
}
