//! Retention service for time-based data purge.
//!
//! Runs as a background task deleting expired idempotency records,
//! conversation buffer entries past the audit window, and terminal
//! pending actions.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::buffer_repo::BufferRepo;
use super::db::Database;
use super::idempotency_repo::IdempotencyRepo;
use super::pending_repo::PendingRepo;
use crate::Result;

/// How often the purge loop ticks. Short enough that idempotency records
/// disappear soon after their 10-minute TTL.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Conversation buffer audit window.
const BUFFER_TTL_DAYS: i64 = 7;

/// Idempotency record TTL.
pub const IDEMPOTENCY_TTL_SECS: u64 = 600;

/// Terminal pending actions are kept one day for inspection.
const PENDING_TERMINAL_TTL_DAYS: i64 = 1;

/// Spawn the retention purge background task.
///
/// The task ticks every [`PURGE_INTERVAL`] until the token is cancelled.
#[must_use]
pub fn spawn_retention_task(db: Arc<Database>, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("retention task shutting down");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(err) = purge(&db).await {
                        error!(%err, "retention purge failed");
                    }
                }
            }
        }
    })
}

async fn purge(db: &Arc<Database>) -> Result<()> {
    let now = Utc::now();

    let idempotency_cutoff =
        now.timestamp_millis() - i64::try_from(IDEMPOTENCY_TTL_SECS * 1000).unwrap_or(i64::MAX);
    let idempotency = IdempotencyRepo::new(Arc::clone(db))
        .purge_before(idempotency_cutoff)
        .await?;

    let buffer_cutoff = (now - chrono::Duration::days(BUFFER_TTL_DAYS)).timestamp_millis();
    let buffer = BufferRepo::new(Arc::clone(db)).purge_before(buffer_cutoff).await?;

    let pending_cutoff = (now - chrono::Duration::days(PENDING_TERMINAL_TTL_DAYS)).to_rfc3339();
    let pending = PendingRepo::new(Arc::clone(db))
        .purge_terminal_before(&pending_cutoff)
        .await?;

    if idempotency + buffer + pending > 0 {
        debug!(idempotency, buffer, pending, "retention purge completed");
    }
    Ok(())
}
