use std::sync::Arc;

use shift_orchestrator::persistence::{db, idempotency_repo::IdempotencyRepo};

#[tokio::test]
async fn put_then_get_replays_the_exact_response() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = IdempotencyRepo::new(Arc::new(pool));

    repo.put("k-42", 200, r#"{"reply":"ok"}"#).await.expect("put");

    let cached = repo
        .get("k-42", 600)
        .await
        .expect("get")
        .expect("record exists");
    assert_eq!(cached.status_code, 200);
    assert_eq!(cached.response_body, r#"{"reply":"ok"}"#);
}

#[tokio::test]
async fn missing_key_returns_none() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = IdempotencyRepo::new(Arc::new(pool));

    assert!(repo.get("missing", 600).await.expect("get").is_none());
}

#[tokio::test]
async fn expired_record_is_not_returned() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = IdempotencyRepo::new(Arc::new(pool));

    repo.put("k-ttl", 200, "body").await.expect("put");
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    assert!(repo.get("k-ttl", 0).await.expect("get").is_none());
}

#[tokio::test]
async fn first_record_stays_authoritative_on_duplicate_put() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = IdempotencyRepo::new(Arc::new(pool));

    repo.put("k-dup", 200, "first").await.expect("put first");
    repo.put("k-dup", 429, "second").await.expect("put second");

    let cached = repo
        .get("k-dup", 600)
        .await
        .expect("get")
        .expect("record exists");
    assert_eq!(cached.status_code, 200);
    assert_eq!(cached.response_body, "first");
}

#[tokio::test]
async fn purge_removes_expired_records() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = IdempotencyRepo::new(Arc::new(pool));

    repo.put("k-old", 200, "body").await.expect("put");
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    let cutoff = chrono::Utc::now().timestamp_millis();
    let purged = repo.purge_before(cutoff).await.expect("purge");
    assert_eq!(purged, 1);
    assert!(repo.get("k-old", 600).await.expect("get").is_none());
}
