use std::sync::Arc;

use shift_orchestrator::persistence::{db, lock_repo::LockRepo};

#[tokio::test]
async fn acquire_grants_and_denies_second_owner() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = LockRepo::new(Arc::new(pool));

    assert!(repo.acquire("sess-1", "worker-a:1", 10_000).await.expect("acquire"));
    assert!(!repo.acquire("sess-1", "worker-b:1", 10_000).await.expect("acquire"));
}

#[tokio::test]
async fn same_owner_reacquires_its_own_lease() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = LockRepo::new(Arc::new(pool));

    assert!(repo.acquire("sess-2", "worker-a:1", 10_000).await.expect("acquire"));
    assert!(repo.acquire("sess-2", "worker-a:1", 10_000).await.expect("reacquire"));
}

#[tokio::test]
async fn expired_lease_is_stolen() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = LockRepo::new(Arc::new(pool));

    assert!(repo.acquire("sess-3", "worker-a:1", 0).await.expect("acquire"));
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    assert!(repo.acquire("sess-3", "worker-b:1", 10_000).await.expect("steal"));
}

#[tokio::test]
async fn renew_extends_only_a_held_lease() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = LockRepo::new(Arc::new(pool));

    assert!(repo.acquire("sess-4", "worker-a:1", 10_000).await.expect("acquire"));
    assert!(repo.renew("sess-4", "worker-a:1", 10_000).await.expect("renew"));
    assert!(!repo.renew("sess-4", "worker-b:1", 10_000).await.expect("renew other"));
}

#[tokio::test]
async fn release_frees_the_resource() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = LockRepo::new(Arc::new(pool));

    assert!(repo.acquire("sess-5", "worker-a:1", 10_000).await.expect("acquire"));
    repo.release("sess-5", "worker-a:1").await.expect("release");
    assert!(repo.acquire("sess-5", "worker-b:1", 10_000).await.expect("acquire after release"));
}

#[tokio::test]
async fn release_by_non_owner_is_a_noop() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = LockRepo::new(Arc::new(pool));

    assert!(repo.acquire("sess-6", "worker-a:1", 10_000).await.expect("acquire"));
    repo.release("sess-6", "worker-b:1").await.expect("foreign release");
    assert!(!repo.acquire("sess-6", "worker-b:1", 10_000).await.expect("still held"));
}

#[tokio::test]
async fn release_all_for_owner_prefix_clears_process_leases() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = LockRepo::new(Arc::new(pool));

    assert!(repo.acquire("sess-7", "worker-a:1", 10_000).await.expect("acquire"));
    assert!(repo.acquire("sess-8", "worker-a:2", 10_000).await.expect("acquire"));
    assert!(repo.acquire("sess-9", "worker-b:1", 10_000).await.expect("acquire"));

    let released = repo.release_all_for_owner("worker-a").await.expect("release all");
    assert_eq!(released, 2);
    assert!(!repo.acquire("sess-9", "worker-c:1", 10_000).await.expect("b still held"));
    assert!(repo.acquire("sess-7", "worker-c:1", 10_000).await.expect("a released"));
}
