//! Workflow webhook delivery.
//!
//! Clinical and operational payloads share the envelope the clinical
//! backend accepts, plus a `sessionID` field. Delivery is idempotent on
//! the webhook side, keyed by the action or message identifier.

use std::time::Duration;

use serde_json::{json, Value};
use tracing::debug;

use crate::backend::types::ClinicalDataRequest;
use crate::config::BackendConfig;
use crate::llm::types::Urgency;
use crate::{AppError, Result};

/// Workflow webhook client.
#[derive(Clone)]
pub struct WorkflowWebhook {
    http: reqwest::Client,
    url: String,
}

impl WorkflowWebhook {
    /// Build the webhook client from backend configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| {
                AppError::Config(format!("failed to build webhook http client: {err}"))
            })?;

        Ok(Self {
            http,
            url: config.webhook_url.clone(),
        })
    }

    /// Deliver a clinical payload.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BackendTransient` or `AppError::Timeout` when
    /// delivery fails.
    pub async fn deliver_clinical(
        &self,
        session_id: &str,
        request: &ClinicalDataRequest,
    ) -> Result<()> {
        let mut envelope = serde_json::to_value(request)
            .map_err(|err| AppError::Invariant(format!("clinical payload not json: {err}")))?;
        if let Value::Object(ref mut map) = envelope {
            map.insert("sessionID".to_string(), Value::String(session_id.to_string()));
        }
        self.post(&envelope).await
    }

    /// Deliver an operational note.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BackendTransient` or `AppError::Timeout` when
    /// delivery fails.
    pub async fn deliver_operational(
        &self,
        session_id: &str,
        message_id: &str,
        text: &str,
        urgency: Urgency,
        session_context: &Value,
    ) -> Result<()> {
        let envelope = json!({
            "sessionID": session_id,
            "messageID": message_id,
            "scenario": "OPERATIONAL_NOTE",
            "clinicalNote": text,
            "urgency": urgency,
            "sessionContext": session_context,
        });
        self.post(&envelope).await
    }

    /// Deliver one newly filled finalization topic.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BackendTransient` or `AppError::Timeout` when
    /// delivery fails.
    pub async fn deliver_topic(
        &self,
        session_id: &str,
        report_id: &str,
        topic: &str,
        value: &str,
    ) -> Result<()> {
        let envelope = json!({
            "sessionID": session_id,
            "reportID": report_id,
            "scenario": "FINALIZATION_TOPIC",
            "topic": topic,
            "value": value,
        });
        self.post(&envelope).await
    }

    async fn post(&self, envelope: &Value) -> Result<()> {
        let response = self.http.post(&self.url).json(envelope).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::BackendTransient(format!(
                "webhook returned status {status}"
            )));
        }
        debug!(%status, "workflow webhook delivery succeeded");
        Ok(())
    }
}
