//! Liveness, readiness and the lock-free debug read path.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::warn;

use crate::models::session::canonical_phone;

use super::AppState;

/// Liveness probe.
pub async fn healthz() -> Response {
    (StatusCode::OK, "ok").into_response()
}

/// Readiness probe: persistence reachable and no backend circuit open.
pub async fn readyz(State(state): State<AppState>) -> Response {
    let db_ok = sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(state.engine.db().as_ref())
        .await
        .is_ok();

    let backend_ok = !state.engine.backend().any_circuit_open();

    if db_ok && backend_ok {
        (StatusCode::OK, Json(json!({ "status": "ready" }))).into_response()
    } else {
        warn!(db_ok, backend_ok, "readiness check failed");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not_ready", "db": db_ok, "backend": backend_ok })),
        )
            .into_response()
    }
}

/// Debug read path: last committed state and recent buffer entries,
/// read without taking the session lock.
pub async fn debug_session(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Response {
    let session_id = canonical_phone(&phone);

    let loaded = match state.engine.sessions().peek(&session_id).await {
        Ok(Some(pair)) => pair,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "session not found" })),
            )
                .into_response();
        }
        Err(err) => {
            warn!(%err, "debug session read failed");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "store unavailable" })),
            )
                .into_response();
        }
    };

    let entries = state
        .engine
        .conversation_buffer()
        .read(&session_id, None, 20, true)
        .await
        .unwrap_or_default();

    let (session, version) = loaded;
    (
        StatusCode::OK,
        Json(json!({
            "session": session,
            "version": version,
            "recent_buffer": entries,
        })),
    )
        .into_response()
}
