use serde_json::json;
use shift_orchestrator::models::pending::{PendingFlow, PendingStatus};
use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::test_helpers::{
    msg, mount_llm, mount_schedule, parse_body, schedule_context, test_engine, INTENT_MARKER,
    OPERATIONAL_MARKER,
};

const PHONE: &str = "+5511977776666";
const SESSION: &str = "5511977776666";

#[tokio::test]
async fn operational_interruption_keeps_the_pending_commit() {
    let server = MockServer::start().await;
    mount_schedule(&server, schedule_context(true, "confirmado", false)).await;

    // The diaper message is operational; everything else is not.
    Mock::given(method("POST"))
        .and(path("/llm/chat/completions"))
        .and(body_string_contains(OPERATIONAL_MARKER))
        .and(body_string_contains("acabou a fralda"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content":
                json!({ "is_operational": true, "urgency": "high" }).to_string()
            } }]
        })))
        .mount(&server)
        .await;
    mount_llm(
        &server,
        OPERATIONAL_MARKER,
        json!({ "is_operational": false, "urgency": "low" }),
    )
    .await;
    mount_llm(
        &server,
        INTENT_MARKER,
        json!({ "intent": "clinico", "confidence": 0.95 }),
    )
    .await;

    // Operational note goes out exactly once; the clinical commit goes
    // out exactly once, after the later "sim".
    Mock::given(method("POST"))
        .and(path("/n8n"))
        .and(body_string_contains("OPERATIONAL_NOTE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/n8n"))
        .and(body_string_contains("VITAL_SIGNS_NOTE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/updateClinicalData"))
        .and(body_partial_json(json!({ "scenario": "VITAL_SIGNS_NOTE" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let engine = test_engine(&server).await;

    // Stage a full clinical measurement.
    let (_, body) = engine
        .process_message(msg(
            "m1",
            PHONE,
            "PA 120x80, FC 78, FR 18, Sat 97, Temp 36.6, ar ambiente, paciente estável",
        ))
        .await;
    assert_eq!(parse_body(&body)["outcomeCode"], "clinical_staged");

    let staged = engine
        .pending_actions()
        .get_staged(SESSION)
        .await
        .expect("get staged")
        .expect("clinical staged");
    assert_eq!(staged.flow, PendingFlow::ClinicalCommit);

    // The operational interruption is delivered without touching the
    // staged action.
    let (_, body) = engine
        .process_message(msg("m2", PHONE, "acabou a fralda"))
        .await;
    assert_eq!(parse_body(&body)["outcomeCode"], "operational_delivered");

    let still_staged = engine
        .pending_actions()
        .get_staged(SESSION)
        .await
        .expect("get staged")
        .expect("still staged");
    assert_eq!(still_staged.action_id, staged.action_id);
    assert_eq!(still_staged.status, PendingStatus::Staged);

    // The next "sim" still commits the clinical payload.
    let (_, body) = engine.process_message(msg("m3", PHONE, "sim")).await;
    assert_eq!(parse_body(&body)["outcomeCode"], "clinical_committed");
}

#[tokio::test]
async fn delivery_failure_surfaces_without_blocking_other_flows() {
    let server = MockServer::start().await;
    mount_schedule(&server, schedule_context(true, "confirmado", false)).await;
    mount_llm(
        &server,
        OPERATIONAL_MARKER,
        json!({ "is_operational": true, "urgency": "normal" }),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/n8n"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let engine = test_engine(&server).await;

    let (status, body) = engine
        .process_message(msg("m1", PHONE, "faltou luva no kit"))
        .await;
    assert_eq!(status, 200);
    assert_eq!(
        parse_body(&body)["outcomeCode"],
        "operational_delivery_failed"
    );

    // The session keeps working: a later message still routes.
    let (status, _) = engine.process_message(msg("m2", PHONE, "sim")).await;
    assert_eq!(status, 200);
}
