//! HTTP client for the four backend endpoints and the note fetch.
//!
//! Every call carries a per-call timeout, an exponential-backoff retry
//! on transient statuses, and a per-endpoint circuit breaker.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::backend::breaker::CircuitBreaker;
use crate::backend::types::{
    ClinicalDataRequest, NoteReport, ScheduleContext, SummaryRequest, UpdateScheduleRequest,
};
use crate::config::BackendConfig;
use crate::{AppError, Result};

/// First retry delay; doubles per attempt.
const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Random jitter added to each retry delay, in milliseconds.
const RETRY_JITTER_MS: u64 = 250;

/// Per-endpoint circuit breakers.
#[derive(Debug)]
struct Breakers {
    get_schedule: CircuitBreaker,
    update_schedule: CircuitBreaker,
    update_clinical: CircuitBreaker,
    update_summary: CircuitBreaker,
    get_note_report: CircuitBreaker,
}

/// Typed client for the shift-platform backend.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    config: BackendConfig,
    breakers: Arc<Breakers>,
}

impl BackendClient {
    /// Build the client from backend configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| {
                AppError::Config(format!("failed to build backend http client: {err}"))
            })?;

        Ok(Self {
            http,
            config: config.clone(),
            breakers: Arc::new(Breakers {
                get_schedule: CircuitBreaker::new("get_schedule_started"),
                update_schedule: CircuitBreaker::new("update_work_schedule_response"),
                update_clinical: CircuitBreaker::new("update_clinical_data"),
                update_summary: CircuitBreaker::new("update_report_summary"),
                get_note_report: CircuitBreaker::new("get_note_report"),
            }),
        })
    }

    /// Fetch the shift context for a caregiver phone number.
    ///
    /// # Errors
    ///
    /// Returns backend-classified errors per the retry/breaker policy.
    pub async fn get_schedule_started(&self, phone_number: &str) -> Result<ScheduleContext> {
        let body = json!({ "phoneNumber": phone_number });
        self.post_json(
            &self.config.get_schedule_url,
            &self.breakers.get_schedule,
            &body,
        )
        .await
    }

    /// Record the attendance response for a schedule.
    ///
    /// # Errors
    ///
    /// Returns backend-classified errors per the retry/breaker policy.
    pub async fn update_work_schedule_response(
        &self,
        request: &UpdateScheduleRequest,
    ) -> Result<()> {
        let _: serde_json::Value = self
            .post_json(
                &self.config.update_schedule_url,
                &self.breakers.update_schedule,
                request,
            )
            .await?;
        Ok(())
    }

    /// Persist a clinical record.
    ///
    /// # Errors
    ///
    /// Returns backend-classified errors per the retry/breaker policy.
    pub async fn update_clinical_data(&self, request: &ClinicalDataRequest) -> Result<()> {
        let _: serde_json::Value = self
            .post_json(
                &self.config.update_clinical_url,
                &self.breakers.update_clinical,
                request,
            )
            .await?;
        Ok(())
    }

    /// Persist the finalization summary.
    ///
    /// # Errors
    ///
    /// Returns backend-classified errors per the retry/breaker policy.
    pub async fn update_report_summary(&self, request: &SummaryRequest) -> Result<()> {
        let _: serde_json::Value = self
            .post_json(
                &self.config.update_summary_url,
                &self.breakers.update_summary,
                request,
            )
            .await?;
        Ok(())
    }

    /// Fetch the notes recorded during the shift.
    ///
    /// # Errors
    ///
    /// Returns backend-classified errors per the retry/breaker policy.
    pub async fn get_note_report(&self, report_id: &str, report_date: &str) -> Result<NoteReport> {
        let body = json!({ "reportID": report_id, "reportDate": report_date });
        self.post_json(
            &self.config.get_note_report_url,
            &self.breakers.get_note_report,
            &body,
        )
        .await
    }

    /// Whether any endpoint circuit is currently open.
    #[must_use]
    pub fn any_circuit_open(&self) -> bool {
        self.breakers.get_schedule.is_open()
            || self.breakers.update_schedule.is_open()
            || self.breakers.update_clinical.is_open()
            || self.breakers.update_summary.is_open()
            || self.breakers.get_note_report.is_open()
    }

    async fn post_json<B: Serialize + Sync, R: DeserializeOwned>(
        &self,
        url: &str,
        breaker: &CircuitBreaker,
        body: &B,
    ) -> Result<R> {
        if !breaker.allow() {
            return Err(AppError::BackendTransient(format!(
                "circuit open for {}",
                breaker.name()
            )));
        }

        let mut attempt: u32 = 0;
        loop {
            match self.post_once(url, body).await {
                Ok(response) => {
                    breaker.record_success();
                    return Ok(response);
                }
                Err(err) => {
                    let retryable = matches!(
                        err,
                        AppError::BackendTransient(_) | AppError::Timeout(_)
                    );
                    if !retryable {
                        breaker.record_failure();
                        return Err(err);
                    }
                    attempt += 1;
                    if attempt > self.config.max_retries {
                        breaker.record_failure();
                        return Err(err);
                    }
                    let delay = backoff_delay(attempt);
                    warn!(
                        endpoint = breaker.name(),
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        %err,
                        "backend call failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn post_once<B: Serialize + Sync, R: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<R> {
        let response = self.http.post(url).json(body).send().await?;
        let status = response.status();

        if status.is_success() {
            debug!(%url, %status, "backend call succeeded");
            return response
                .json::<R>()
                .await
                .map_err(|err| AppError::BackendPermanent(format!("invalid backend json: {err}")));
        }

        let detail = response.text().await.unwrap_or_default();
        if status.as_u16() == 408 || status.as_u16() == 429 || status.is_server_error() {
            Err(AppError::BackendTransient(format!(
                "status {status}: {detail}"
            )))
        } else {
            Err(AppError::BackendPermanent(format!(
                "status {status}: {detail}"
            )))
        }
    }
}

/// Exponential backoff with jitter for the given attempt (1-based).
fn backoff_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(6);
    let base = INITIAL_RETRY_DELAY * 2_u32.saturating_pow(exponent);
    let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..RETRY_JITTER_MS));
    base + jitter
}
