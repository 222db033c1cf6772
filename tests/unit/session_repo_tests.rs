use std::sync::Arc;

use shift_orchestrator::models::session::{SessionState, ShiftResponse};
use shift_orchestrator::persistence::{db, session_repo::SessionRepo};
use shift_orchestrator::AppError;

#[tokio::test]
async fn load_missing_session_returns_default_and_version_zero() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = SessionRepo::new(Arc::new(pool));

    let (state, version) = repo.load("+55 11 99999-9999").await.expect("load");
    assert_eq!(version, 0);
    assert_eq!(state.session_id, "5511999999999");
    assert_eq!(state.phone_number, "+55 11 99999-9999");
    assert_eq!(state.response, ShiftResponse::Empty);
    assert!(!state.finish_reminder_sent);
}

#[tokio::test]
async fn save_then_load_round_trips_with_incremented_version() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = SessionRepo::new(Arc::new(pool));

    let (mut state, version) = repo.load("5511988887777").await.expect("load");
    state.schedule_id = Some("sched-1".into());
    state.shift_allow = true;
    state.response = ShiftResponse::AguardandoResposta;

    let next = repo.save(&state, version).await.expect("save");
    assert_eq!(next, 1);

    let (reloaded, reloaded_version) = repo.load("5511988887777").await.expect("reload");
    assert_eq!(reloaded_version, 1);
    assert_eq!(reloaded.schedule_id.as_deref(), Some("sched-1"));
    assert_eq!(reloaded.response, ShiftResponse::AguardandoResposta);
}

#[tokio::test]
async fn version_increases_by_exactly_one_per_write() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = SessionRepo::new(Arc::new(pool));

    let (state, version) = repo.load("5511900000001").await.expect("load");
    assert_eq!(version, 0);

    let mut current = version;
    for _ in 0..5 {
        let next = repo.save(&state, current).await.expect("save");
        assert_eq!(next, current + 1);
        current = next;
    }
}

#[tokio::test]
async fn stale_version_save_conflicts() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = SessionRepo::new(Arc::new(pool));

    let (state, version) = repo.load("5511900000002").await.expect("load");
    repo.save(&state, version).await.expect("first save");

    let err = repo.save(&state, version).await.expect_err("stale save");
    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");
}

#[tokio::test]
async fn concurrent_create_conflicts() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = SessionRepo::new(Arc::new(pool));

    let state = SessionState::new("5511900000003");
    repo.save(&state, 0).await.expect("first create");

    let err = repo.save(&state, 0).await.expect_err("second create");
    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");
}

#[tokio::test]
async fn peek_reads_last_committed_without_default() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = SessionRepo::new(Arc::new(pool));

    assert!(repo.peek("5511900000004").await.expect("peek").is_none());

    let (mut state, version) = repo.load("5511900000004").await.expect("load");
    state.caregiver_name = Some("Maria Silva".into());
    repo.save(&state, version).await.expect("save");

    let (peeked, peeked_version) = repo
        .peek("5511900000004")
        .await
        .expect("peek")
        .expect("session exists");
    assert_eq!(peeked_version, 1);
    assert_eq!(peeked.caregiver_name.as_deref(), Some("Maria Silva"));
}
