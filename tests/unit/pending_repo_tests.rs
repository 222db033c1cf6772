use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use shift_orchestrator::models::pending::{PendingAction, PendingFlow, PendingStatus};
use shift_orchestrator::persistence::{db, pending_repo::PendingRepo};
use shift_orchestrator::AppError;

fn staged_action(session_id: &str) -> PendingAction {
    PendingAction::new(
        session_id,
        PendingFlow::EscalaCommit,
        json!({ "scheduleId": "sched-1", "responseValue": "confirmado" }),
        "registrar resposta de presença".into(),
    )
}

#[tokio::test]
async fn put_then_get_staged_round_trips() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = PendingRepo::new(Arc::new(pool));

    let action = staged_action("5511999990001");
    repo.put(&action).await.expect("put");

    let staged = repo
        .get_staged("5511999990001")
        .await
        .expect("get")
        .expect("staged exists");
    assert_eq!(staged.action_id, action.action_id);
    assert_eq!(staged.flow, PendingFlow::EscalaCommit);
    assert_eq!(staged.status, PendingStatus::Staged);
    assert_eq!(staged.payload["responseValue"], "confirmado");
}

#[tokio::test]
async fn staging_cancels_previous_staged_action() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = PendingRepo::new(Arc::new(pool));

    let first = staged_action("5511999990002");
    repo.put(&first).await.expect("put first");
    let second = staged_action("5511999990002");
    repo.put(&second).await.expect("put second");

    let staged = repo
        .get_staged("5511999990002")
        .await
        .expect("get")
        .expect("staged exists");
    assert_eq!(staged.action_id, second.action_id);

    let previous = repo
        .get_by_id(&first.action_id)
        .await
        .expect("get by id")
        .expect("first exists");
    assert_eq!(previous.status, PendingStatus::Cancelled);
}

#[tokio::test]
async fn full_lifecycle_staged_confirmed_executed() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = PendingRepo::new(Arc::new(pool));

    let action = staged_action("5511999990003");
    repo.put(&action).await.expect("put");

    repo.transition(
        "5511999990003",
        &action.action_id,
        PendingStatus::Staged,
        PendingStatus::Confirmed,
    )
    .await
    .expect("staged -> confirmed");
    repo.transition(
        "5511999990003",
        &action.action_id,
        PendingStatus::Confirmed,
        PendingStatus::Executed,
    )
    .await
    .expect("confirmed -> executed");

    let executed = repo
        .get_by_id(&action.action_id)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(executed.status, PendingStatus::Executed);
    assert!(repo.get_staged("5511999990003").await.expect("get").is_none());
}

#[tokio::test]
async fn illegal_transition_is_rejected_before_touching_the_store() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = PendingRepo::new(Arc::new(pool));

    let action = staged_action("5511999990004");
    repo.put(&action).await.expect("put");

    let err = repo
        .transition(
            "5511999990004",
            &action.action_id,
            PendingStatus::Executed,
            PendingStatus::Staged,
        )
        .await
        .expect_err("illegal transition");
    assert!(matches!(err, AppError::Invariant(_)), "got {err:?}");

    let untouched = repo
        .get_by_id(&action.action_id)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(untouched.status, PendingStatus::Staged);
}

#[tokio::test]
async fn transition_from_wrong_status_conflicts() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = PendingRepo::new(Arc::new(pool));

    let action = staged_action("5511999990005");
    repo.put(&action).await.expect("put");
    repo.transition(
        "5511999990005",
        &action.action_id,
        PendingStatus::Staged,
        PendingStatus::Cancelled,
    )
    .await
    .expect("cancel");

    let err = repo
        .transition(
            "5511999990005",
            &action.action_id,
            PendingStatus::Staged,
            PendingStatus::Confirmed,
        )
        .await
        .expect_err("double transition");
    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");
}

#[tokio::test]
async fn expired_staged_action_is_cancelled_on_read() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = PendingRepo::new(Arc::new(pool));

    let mut action = staged_action("5511999990006");
    action.expires_at = Utc::now() - Duration::minutes(1);
    repo.put(&action).await.expect("put");

    assert!(repo.get_staged("5511999990006").await.expect("get").is_none());

    let cancelled = repo
        .get_by_id(&action.action_id)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(cancelled.status, PendingStatus::Cancelled);
}

#[tokio::test]
async fn purge_removes_only_old_terminal_records() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = PendingRepo::new(Arc::new(pool));

    let mut old_cancelled = staged_action("5511999990007");
    old_cancelled.created_at = Utc::now() - Duration::days(3);
    old_cancelled.status = PendingStatus::Cancelled;
    repo.put(&old_cancelled).await.expect("put old");

    let live = staged_action("5511999990008");
    repo.put(&live).await.expect("put live");

    let cutoff = (Utc::now() - Duration::days(1)).to_rfc3339();
    let purged = repo.purge_terminal_before(&cutoff).await.expect("purge");
    assert_eq!(purged, 1);

    assert!(repo.get_staged("5511999990008").await.expect("get").is_some());
}
