use std::sync::Arc;

use serde_json::{json, Value};
use shift_orchestrator::http::{build_router, AppState};
use wiremock::MockServer;

use super::test_helpers::{mount_schedule, schedule_context, test_engine};

const PHONE: &str = "+5511944443333";
const SESSION: &str = "5511944443333";

/// Bind the ingress on an ephemeral port and return its base URL.
async fn spawn_server(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let router = build_router(state);
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn healthz_and_readyz_answer() {
    let mock = MockServer::start().await;
    let engine = Arc::new(test_engine(&mock).await);
    let base = spawn_server(AppState {
        engine: Arc::clone(&engine),
    })
    .await;

    let client = reqwest::Client::new();

    let health = client.get(format!("{base}/healthz")).send().await.expect("healthz");
    assert_eq!(health.status().as_u16(), 200);

    let ready = client.get(format!("{base}/readyz")).send().await.expect("readyz");
    assert_eq!(ready.status().as_u16(), 200);
    let body: Value = ready.json().await.expect("json");
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn ingest_round_trip_with_header_replay() {
    let mock = MockServer::start().await;
    mount_schedule(&mock, schedule_context(true, "aguardando resposta", false)).await;
    let engine = Arc::new(test_engine(&mock).await);
    let base = spawn_server(AppState {
        engine: Arc::clone(&engine),
    })
    .await;

    let client = reqwest::Client::new();
    let request_body = json!({
        "message_id": "m1",
        "phoneNumber": PHONE,
        "text": "cheguei"
    });

    let first = client
        .post(format!("{base}/webhook/ingest"))
        .header("X-Idempotency-Key", "k-http-1")
        .json(&request_body)
        .send()
        .await
        .expect("first post");
    assert_eq!(first.status().as_u16(), 200);
    let first_body = first.text().await.expect("body");
    let parsed: Value = serde_json::from_str(&first_body).expect("json");
    assert_eq!(parsed["outcomeCode"], "escala_staged");
    assert_eq!(parsed["sessionId"], SESSION);
    assert_eq!(parsed["status"], "success");

    let second = client
        .post(format!("{base}/webhook/ingest"))
        .header("X-Idempotency-Key", "k-http-1")
        .json(&request_body)
        .send()
        .await
        .expect("second post");
    assert_eq!(second.status().as_u16(), 200);
    let second_body = second.text().await.expect("body");
    assert_eq!(second_body, first_body, "replay must be byte-identical");
}

#[tokio::test]
async fn debug_endpoint_reads_without_the_lock() {
    let mock = MockServer::start().await;
    mount_schedule(&mock, schedule_context(true, "aguardando resposta", false)).await;
    let engine = Arc::new(test_engine(&mock).await);
    let base = spawn_server(AppState {
        engine: Arc::clone(&engine),
    })
    .await;

    let client = reqwest::Client::new();

    let missing = client
        .get(format!("{base}/debug/sessions/{PHONE}"))
        .send()
        .await
        .expect("get");
    assert_eq!(missing.status().as_u16(), 404);

    client
        .post(format!("{base}/webhook/ingest"))
        .json(&json!({ "message_id": "m1", "phoneNumber": PHONE, "text": "cheguei" }))
        .send()
        .await
        .expect("ingest");

    // Hold the session lock; the debug read must still answer.
    assert!(engine
        .locks()
        .acquire(SESSION, "another-worker:1", 60_000)
        .await
        .expect("foreign lock"));

    let found = client
        .get(format!("{base}/debug/sessions/{PHONE}"))
        .send()
        .await
        .expect("get");
    assert_eq!(found.status().as_u16(), 200);
    let body: Value = found.json().await.expect("json");
    assert_eq!(body["version"], 1);
    assert_eq!(body["session"]["session_id"], SESSION);
    assert!(body["recent_buffer"].as_array().is_some_and(|b| !b.is_empty()));
}
