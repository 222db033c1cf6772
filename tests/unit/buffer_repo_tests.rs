use std::sync::Arc;

use shift_orchestrator::models::buffer::{BufferEntry, Direction};
use shift_orchestrator::persistence::{buffer_repo::BufferRepo, db};

fn entry(session_id: &str, epoch: i64, direction: Direction, text: &str) -> BufferEntry {
    BufferEntry {
        session_id: session_id.into(),
        created_at_epoch: epoch,
        direction,
        text: text.into(),
        message_id: format!("m-{epoch}"),
        meta: None,
    }
}

#[tokio::test]
async fn append_then_read_orders_by_epoch_ascending() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = BufferRepo::new(Arc::new(pool));

    repo.append(&entry("s1", 300, Direction::Out, "terceira")).await.expect("append");
    repo.append(&entry("s1", 100, Direction::In, "primeira")).await.expect("append");
    repo.append(&entry("s1", 200, Direction::In, "segunda")).await.expect("append");

    let entries = repo.read("s1", None, 10, false).await.expect("read");
    let texts: Vec<&str> = entries.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, ["primeira", "segunda", "terceira"]);
}

#[tokio::test]
async fn descending_read_reverses_the_order() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = BufferRepo::new(Arc::new(pool));

    repo.append(&entry("s2", 100, Direction::In, "primeira")).await.expect("append");
    repo.append(&entry("s2", 200, Direction::Out, "segunda")).await.expect("append");

    let entries = repo.read("s2", None, 10, true).await.expect("read");
    assert_eq!(entries[0].text, "segunda");
    assert_eq!(entries[1].text, "primeira");
}

#[tokio::test]
async fn since_is_an_exclusive_lower_bound_and_limit_applies() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = BufferRepo::new(Arc::new(pool));

    for epoch in [100, 200, 300, 400] {
        repo.append(&entry("s3", epoch, Direction::In, "msg")).await.expect("append");
    }

    let entries = repo.read("s3", Some(100), 2, false).await.expect("read");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].created_at_epoch, 200);
    assert_eq!(entries[1].created_at_epoch, 300);
}

#[tokio::test]
async fn sessions_do_not_leak_into_each_other() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = BufferRepo::new(Arc::new(pool));

    repo.append(&entry("s4", 100, Direction::In, "do s4")).await.expect("append");
    repo.append(&entry("s5", 100, Direction::In, "do s5")).await.expect("append");

    let entries = repo.read("s4", None, 10, false).await.expect("read");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].text, "do s4");
}

#[tokio::test]
async fn purge_removes_entries_older_than_cutoff() {
    let pool = db::connect_memory().await.expect("db connect");
    let repo = BufferRepo::new(Arc::new(pool));

    repo.append(&entry("s6", 100, Direction::In, "velha")).await.expect("append");
    repo.append(&entry("s6", 900, Direction::In, "nova")).await.expect("append");

    let purged = repo.purge_before(500).await.expect("purge");
    assert_eq!(purged, 1);

    let entries = repo.read("s6", None, 10, false).await.expect("read");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].text, "nova");
}
