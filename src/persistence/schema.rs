//! `SQLite` schema bootstrap logic.
//!
//! All table definitions use `CREATE TABLE IF NOT EXISTS` — safe to
//! re-run on every server startup. Produces a convergent result.
//! No statement spans more than one table; the stores never require
//! cross-table transactions.

use sqlx::SqlitePool;

use crate::Result;

/// Apply all table definitions to the connected `SQLite` database.
///
/// Creates all five stores idempotently. Safe to call on every startup.
///
/// # Errors
///
/// Returns `AppError::Db` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS session_state (
    session_id      TEXT PRIMARY KEY NOT NULL,
    phone_number    TEXT NOT NULL,
    state           TEXT NOT NULL,
    version         INTEGER NOT NULL DEFAULT 0,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS pending_action (
    action_id       TEXT PRIMARY KEY NOT NULL,
    session_id      TEXT NOT NULL,
    flow            TEXT NOT NULL CHECK(flow IN ('escala_commit','clinical_commit','finalize_commit')),
    payload         TEXT NOT NULL,
    description     TEXT NOT NULL,
    status          TEXT NOT NULL CHECK(status IN ('staged','confirmed','executed','cancelled')),
    created_at      TEXT NOT NULL,
    expires_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS conversation_buffer (
    entry_id        INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id      TEXT NOT NULL,
    created_at_epoch INTEGER NOT NULL,
    direction       TEXT NOT NULL CHECK(direction IN ('in','out')),
    text            TEXT NOT NULL,
    message_id      TEXT NOT NULL,
    meta            TEXT
);

CREATE TABLE IF NOT EXISTS session_lock (
    resource        TEXT PRIMARY KEY NOT NULL,
    owner           TEXT NOT NULL,
    lease_until_epoch INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS idempotency (
    idempotency_key TEXT PRIMARY KEY NOT NULL,
    status_code     INTEGER NOT NULL,
    response_body   TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    created_at_epoch INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pending_session_status ON pending_action(session_id, status);
CREATE INDEX IF NOT EXISTS idx_buffer_session_epoch ON conversation_buffer(session_id, created_at_epoch);
CREATE INDEX IF NOT EXISTS idx_idempotency_epoch ON idempotency(created_at_epoch);
";

    sqlx::raw_sql(ddl).execute(pool).await?;
    Ok(())
}
