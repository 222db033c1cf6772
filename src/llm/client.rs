//! Low-level chat-completions client.
//!
//! Temperature 0, JSON object response format, bounded retry on
//! malformed JSON, and a circuit breaker that returns
//! `AppError::LlmUnavailable` while open.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::backend::breaker::CircuitBreaker;
use crate::config::LlmConfig;
use crate::llm::types::{ChatMessage, ChatRequest, ChatResponse, ResponseFormat};
use crate::{AppError, Result};

/// Retries on malformed or schema-mismatched JSON replies.
const MALFORMED_RETRIES: u32 = 2;

/// LLM failures tolerated before the circuit opens.
const LLM_FAILURE_THRESHOLD: u32 = 3;

/// Cool-down before the LLM circuit admits a probe.
const LLM_COOLDOWN: Duration = Duration::from_secs(30);

/// Chat-completions client shared by all six gateway calls.
#[derive(Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    breaker: Arc<CircuitBreaker>,
}

impl ChatClient {
    /// Build the client from LLM configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| AppError::Config(format!("failed to build llm http client: {err}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            breaker: Arc::new(CircuitBreaker::with_policy(
                "llm",
                LLM_FAILURE_THRESHOLD,
                LLM_COOLDOWN,
            )),
        })
    }

    /// Whether the circuit is currently open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.breaker.is_open()
    }

    /// Issue one typed JSON call.
    ///
    /// The reply must parse into `T`; malformed JSON or a schema mismatch
    /// is retried up to [`MALFORMED_RETRIES`] times before counting as a
    /// provider failure.
    ///
    /// # Errors
    ///
    /// Returns `AppError::LlmUnavailable` when the provider is
    /// unreachable, the circuit is open, or the reply never parses.
    pub async fn call<T: DeserializeOwned>(
        &self,
        model: &str,
        system: &str,
        user: &str,
    ) -> Result<T> {
        if !self.breaker.allow() {
            return Err(AppError::LlmUnavailable("llm circuit open".into()));
        }

        let mut last_error = String::new();
        for attempt in 0..=MALFORMED_RETRIES {
            match self.call_once(model, system, user).await {
                Ok(content) => match serde_json::from_str::<T>(&content) {
                    Ok(parsed) => {
                        self.breaker.record_success();
                        return Ok(parsed);
                    }
                    Err(err) => {
                        warn!(attempt, %err, "llm reply failed schema validation");
                        last_error = format!("schema validation failed: {err}");
                    }
                },
                Err(err) => {
                    self.breaker.record_failure();
                    return Err(err);
                }
            }
        }

        self.breaker.record_failure();
        Err(AppError::LlmUnavailable(last_error))
    }

    async fn call_once(&self, model: &str, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user.to_string(),
                },
            ],
            temperature: 0.0,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| AppError::LlmUnavailable(format!("llm request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::LlmUnavailable(format!(
                "llm returned status {status}"
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|err| AppError::LlmUnavailable(format!("llm response not json: {err}")))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::LlmUnavailable("llm reply had no content".into()))?;

        debug!(model, bytes = content.len(), "llm call completed");
        Ok(content)
    }
}
