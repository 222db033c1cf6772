//! Main message ingress: `POST /webhook/ingest`.

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::engine::pipeline::InboundMessage;

use super::AppState;

/// Request body delivered by the WhatsApp gateway.
#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    /// Gateway message identifier.
    pub message_id: String,
    /// Caregiver phone number.
    #[serde(rename = "phoneNumber")]
    pub phone_number: String,
    /// Message text.
    pub text: String,
    /// Gateway metadata.
    #[serde(default)]
    pub meta: Option<serde_json::Value>,
}

/// Handle one inbound caregiver message.
pub async fn ingest(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<IngestRequest>,
) -> Response {
    let idempotency_key = headers
        .get("x-idempotency-key")
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);

    let message = InboundMessage {
        message_id: request.message_id,
        phone_number: request.phone_number,
        text: request.text,
        idempotency_key,
        meta: request.meta,
    };

    let (status_code, body) = state.engine.process_message(message).await;
    json_response(status_code, body)
}

/// Build a response from a pre-serialized JSON body.
///
/// The body bytes are passed through untouched so idempotent replays
/// stay byte-identical.
fn json_response(status_code: u16, body: String) -> Response {
    let status = StatusCode::from_u16(status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}
