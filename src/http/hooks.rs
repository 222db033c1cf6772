//! Template-fired hook: the gateway notifies us after sending a
//! proactive template so the session can absorb its hints.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::engine::pipeline::TemplateHints;
use crate::persistence::retention::IDEMPOTENCY_TTL_SECS;
use crate::AppError;

use super::AppState;

/// Metadata carried by a template-fired event.
#[derive(Debug, Default, Deserialize)]
pub struct TemplateMetadata {
    /// Fields the template asked the caregiver for.
    #[serde(default)]
    pub hint_campos_faltantes: Option<Vec<String>>,
    /// The template told the caregiver the shift is ready to close.
    #[serde(rename = "finishReminderSent", default)]
    pub finish_reminder_sent: Option<bool>,
    /// Shift day the template refers to.
    #[serde(rename = "shiftDay", default)]
    pub shift_day: Option<String>,
}

/// Request body for `POST /hooks/template-fired`.
#[derive(Debug, Deserialize)]
pub struct TemplateFiredRequest {
    /// Caregiver phone number.
    #[serde(rename = "phoneNumber")]
    pub phone_number: String,
    /// Template name the gateway sent.
    pub template: String,
    /// Optional hints.
    #[serde(default)]
    pub metadata: Option<TemplateMetadata>,
}

/// Merge template hints into the session state.
pub async fn template_fired(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<TemplateFiredRequest>,
) -> Response {
    let key = headers
        .get("x-idempotency-key")
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);

    if let Some(ref key) = key {
        match state.engine.idempotency.get(key, IDEMPOTENCY_TTL_SECS).await {
            Ok(Some(cached)) => {
                let status = StatusCode::from_u16(cached.status_code)
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                return (status, cached.response_body).into_response();
            }
            Ok(None) => {}
            Err(err) => warn!(%err, "idempotency lookup failed; proceeding"),
        }
    }

    let metadata = request.metadata.unwrap_or_default();
    let hints = TemplateHints {
        phone_number: request.phone_number,
        template: request.template,
        finish_reminder_sent: metadata.finish_reminder_sent,
        shift_day: metadata.shift_day,
        missing_fields_hint: metadata.hint_campos_faltantes,
    };

    let (status, body) = match state.engine.apply_template_hints(hints).await {
        Ok(session_id) => (
            StatusCode::OK,
            json!({ "status": "ok", "sessionId": session_id }).to_string(),
        ),
        Err(AppError::LockDenied(_)) => (
            StatusCode::TOO_MANY_REQUESTS,
            json!({ "status": "busy" }).to_string(),
        ),
        Err(AppError::Input(reason)) => (
            StatusCode::BAD_REQUEST,
            json!({ "status": "error", "detail": reason }).to_string(),
        ),
        Err(err) => {
            warn!(%err, "template hint application failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "status": "error" }).to_string(),
            )
        }
    };

    if let Some(ref key) = key {
        if status == StatusCode::OK {
            if let Err(err) = state.engine.idempotency.put(key, status.as_u16(), &body).await {
                warn!(%err, "failed to record idempotent hook response");
            }
        }
    }

    (status, body).into_response()
}
