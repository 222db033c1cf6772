//! Global configuration loaded from the environment.
//!
//! Every deployment knob is an environment variable; CLI flags in `main`
//! may override the port, database path and log format after loading.

use std::env;
use std::time::Duration;

use crate::{AppError, Result};

/// Default per-backend-call timeout in seconds.
const DEFAULT_LAMBDA_TIMEOUT_SECS: u64 = 30;
/// Default retry budget for transient backend failures.
const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default overall per-request deadline in seconds.
const DEFAULT_REQUEST_DEADLINE_SECS: u64 = 45;
/// Default per-session lock lease in milliseconds.
const DEFAULT_LOCK_LEASE_MS: u64 = 10_000;
/// Default LLM call timeout in seconds.
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 10;

/// LLM provider connectivity and model selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    /// API key for the chat-completions endpoint.
    pub api_key: String,
    /// Base URL of the provider; override for tests and proxies.
    pub base_url: String,
    /// Model used for intent/confirmation/operational classification.
    pub intent_model: String,
    /// Model used for clinical and finalization extraction.
    pub extractor_model: String,
    /// Hard cap on a single LLM call.
    pub timeout_secs: u64,
}

/// Backend endpoint URLs and retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Shift-context hydration endpoint.
    pub get_schedule_url: String,
    /// Attendance response endpoint.
    pub update_schedule_url: String,
    /// Clinical data endpoint.
    pub update_clinical_url: String,
    /// Shift report summary endpoint.
    pub update_summary_url: String,
    /// Existing-notes fetch endpoint used by finalization.
    pub get_note_report_url: String,
    /// Workflow webhook persisting clinical/operational payloads.
    pub webhook_url: String,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
    /// Retry budget for transient failures.
    pub max_retries: u32,
}

/// Global configuration assembled from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalConfig {
    /// HTTP port for the ingress server.
    pub http_port: u16,
    /// `SQLite` database path for the five state stores.
    pub db_path: String,
    /// LLM provider settings.
    pub llm: LlmConfig,
    /// Backend endpoints and retry policy.
    pub backend: BackendConfig,
    /// Per-session lock lease in milliseconds.
    pub lock_lease_ms: u64,
    /// Overall per-request deadline in seconds.
    pub request_deadline_secs: u64,
    /// Default log verbosity when `RUST_LOG` is unset.
    pub log_level: String,
}

fn required(key: &str) -> Result<String> {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Config(format!("missing required environment variable {key}")))
}

fn optional(key: &str, default: &str) -> String {
    env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string())
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) if !raw.is_empty() => raw
            .parse()
            .map_err(|_| AppError::Config(format!("invalid value for {key}: {raw}"))),
        _ => Ok(default),
    }
}

impl GlobalConfig {
    /// Assemble configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// numeric variable fails to parse, or if validation fails.
    pub fn from_env() -> Result<Self> {
        let config = Self {
            http_port: parsed("HTTP_PORT", 8080)?,
            db_path: optional("STATE_STORE_PATH", "data/orchestrator.db"),
            llm: LlmConfig {
                api_key: required("OPENAI_API_KEY")?,
                base_url: optional("OPENAI_BASE_URL", "https://api.openai.com/v1"),
                intent_model: optional("INTENT_MODEL", "gpt-4o-mini"),
                extractor_model: optional("EXTRACTOR_MODEL", "gpt-4o-mini"),
                timeout_secs: parsed("TIMEOUT_LLM", DEFAULT_LLM_TIMEOUT_SECS)?,
            },
            backend: BackendConfig {
                get_schedule_url: required("LAMBDA_GET_SCHEDULE")?,
                update_schedule_url: required("LAMBDA_UPDATE_SCHEDULE")?,
                update_clinical_url: required("LAMBDA_UPDATE_CLINICAL")?,
                update_summary_url: required("LAMBDA_UPDATE_SUMMARY")?,
                get_note_report_url: required("LAMBDA_GET_NOTE_REPORT")?,
                webhook_url: required("N8N_WEBHOOK_URL")?,
                timeout_secs: parsed("TIMEOUT_LAMBDAS", DEFAULT_LAMBDA_TIMEOUT_SECS)?,
                max_retries: parsed("MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            },
            lock_lease_ms: parsed("LOCK_LEASE_MS", DEFAULT_LOCK_LEASE_MS)?,
            request_deadline_secs: parsed(
                "REQUEST_DEADLINE_SECS",
                DEFAULT_REQUEST_DEADLINE_SECS,
            )?,
            log_level: optional("LOG_LEVEL", "info"),
        };
        config.validate()?;
        Ok(config)
    }

    /// Per-backend-call timeout as a [`Duration`].
    #[must_use]
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_secs)
    }

    /// Overall per-request deadline as a [`Duration`].
    #[must_use]
    pub fn request_deadline(&self) -> Duration {
        Duration::from_secs(self.request_deadline_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.backend.timeout_secs == 0 {
            return Err(AppError::Config(
                "TIMEOUT_LAMBDAS must be greater than zero".into(),
            ));
        }
        if self.request_deadline_secs == 0 {
            return Err(AppError::Config(
                "REQUEST_DEADLINE_SECS must be greater than zero".into(),
            ));
        }
        if self.lock_lease_ms < 1_000 {
            return Err(AppError::Config(
                "LOCK_LEASE_MS must be at least 1000".into(),
            ));
        }
        Ok(())
    }
}
