//! Per-message pipeline: idempotency → lock → deadline → load →
//! route → subgraph → consolidate → OCC save → buffer → idempotent
//! record → unlock.
//!
//! The conditional session write is the final state mutation of a turn,
//! so a timeout or crash never leaves a partial write behind.

use rand::Rng;
use serde::Serialize;
use tracing::{info_span, warn, Instrument};
use uuid::Uuid;

use crate::engine::router;
use crate::engine::subgraphs::{self, auxiliar, Reroute, TurnMemo};
use crate::engine::{bootstrap, consolidator, Engine};
use crate::models::buffer::BufferEntry;
use crate::models::outcome::OutcomeCode;
use crate::models::session::{canonical_phone, SessionState};
use crate::persistence::retention::IDEMPOTENCY_TTL_SECS;
use crate::{AppError, Result};

/// Lock acquisition attempts before answering busy.
const LOCK_ATTEMPTS: u32 = 3;

/// OCC reload-and-replay attempts before answering conflict.
const OCC_ATTEMPTS: u32 = 3;

/// Inbound caregiver message, already decoded by the HTTP layer.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Gateway message identifier.
    pub message_id: String,
    /// Caregiver phone number as received.
    pub phone_number: String,
    /// Message text.
    pub text: String,
    /// `X-Idempotency-Key` header, when present.
    pub idempotency_key: Option<String>,
    /// Gateway metadata, recorded in the buffer.
    pub meta: Option<serde_json::Value>,
}

/// Response body for `POST /webhook/ingest`.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    /// Caregiver-facing reply.
    pub reply: String,
    /// Canonical session identifier.
    #[serde(rename = "sessionId")]
    pub session_id: String,
    /// `success`, `busy` or `error`.
    pub status: String,
    /// Outcome code of the turn.
    #[serde(rename = "outcomeCode")]
    pub outcome_code: String,
}

impl Engine {
    /// Process one inbound message end to end.
    ///
    /// Always produces an HTTP status plus a serialized
    /// [`IngestResponse`] body; engine errors are mapped to outcome
    /// codes and never escape.
    pub async fn process_message(&self, msg: InboundMessage) -> (u16, String) {
        let session_id = canonical_phone(&msg.phone_number);
        let span = info_span!("process_message", session_id = %session_id,
            message_id = %msg.message_id);
        self.process_inner(session_id, msg).instrument(span).await
    }

    async fn process_inner(&self, session_id: String, msg: InboundMessage) -> (u16, String) {
        if session_id.is_empty() || msg.text.trim().is_empty() || msg.message_id.is_empty() {
            let state = SessionState::new(&msg.phone_number);
            return respond(&state, OutcomeCode::InputError, 200, "error");
        }

        let key = msg
            .idempotency_key
            .clone()
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| msg.message_id.clone());

        match self.idempotency.get(&key, IDEMPOTENCY_TTL_SECS).await {
            Ok(Some(cached)) => {
                return (cached.status_code, cached.response_body);
            }
            Ok(None) => {}
            Err(err) => warn!(%err, "idempotency lookup failed; proceeding"),
        }

        let owner = format!("{}:{}", self.worker_id, Uuid::new_v4());
        if !self.acquire_lock(&session_id, &owner).await {
            let state = SessionState::new(&msg.phone_number);
            return respond(&state, OutcomeCode::Busy, 429, "busy");
        }
        // The lease is shorter than the request deadline; keep it alive
        // while backend retries stretch the turn.
        let renewal = self.spawn_lease_renewal(&session_id, &owner);

        let deadline = self.config.request_deadline();
        let turn = tokio::time::timeout(deadline, self.run_turn(&session_id, &msg, &key)).await;

        let response = match turn {
            Ok(Ok(pair)) => pair,
            Ok(Err(AppError::Conflict(reason))) => {
                warn!(%reason, "turn failed after occ retries");
                let state = SessionState::new(&msg.phone_number);
                respond(&state, OutcomeCode::Conflict, 200, "error")
            }
            Ok(Err(AppError::LockDenied(_))) => {
                let state = SessionState::new(&msg.phone_number);
                respond(&state, OutcomeCode::Busy, 429, "busy")
            }
            Ok(Err(err)) => {
                warn!(%err, "turn failed");
                let state = SessionState::new(&msg.phone_number);
                respond(&state, OutcomeCode::Conflict, 503, "error")
            }
            Err(_elapsed) => {
                warn!("per-request deadline elapsed");
                let state = SessionState::new(&msg.phone_number);
                respond(&state, OutcomeCode::Timeout, 408, "error")
            }
        };

        renewal.abort();
        if let Err(err) = self.locks.release(&session_id, &owner).await {
            warn!(%err, "lock release failed; lease will expire");
        }
        response
    }

    /// Renew the session lease at a third of its duration until the
    /// caller aborts the task.
    fn spawn_lease_renewal(
        &self,
        session_id: &str,
        owner: &str,
    ) -> tokio::task::JoinHandle<()> {
        let locks = self.locks.clone();
        let lease_ms = self.config.lock_lease_ms;
        let session_id = session_id.to_string();
        let owner = owner.to_string();
        tokio::spawn(async move {
            let interval = std::time::Duration::from_millis((lease_ms / 3).max(500));
            loop {
                tokio::time::sleep(interval).await;
                match locks.renew(&session_id, &owner, lease_ms).await {
                    Ok(true) => {}
                    Ok(false) => {
                        warn!(%session_id, "session lease lost; stopping renewal");
                        break;
                    }
                    Err(err) => warn!(%err, "session lease renewal failed"),
                }
            }
        })
    }

    async fn acquire_lock(&self, session_id: &str, owner: &str) -> bool {
        for attempt in 0..LOCK_ATTEMPTS {
            match self
                .locks
                .acquire(session_id, owner, self.config.lock_lease_ms)
                .await
            {
                Ok(true) => return true,
                Ok(false) => {}
                Err(err) => warn!(%err, "lock acquisition failed"),
            }
            let backoff = jitter_ms(50, 150) * u64::from(attempt + 1);
            tokio::time::sleep(std::time::Duration::from_millis(backoff)).await;
        }
        false
    }

    async fn run_turn(
        &self,
        session_id: &str,
        msg: &InboundMessage,
        key: &str,
    ) -> Result<(u16, String)> {
        let (mut state, mut version) = self.sessions.load(&msg.phone_number).await?;

        if bootstrap::needs_hydration(&state, version) {
            // Failure degrades to the help flow; the turn proceeds.
            bootstrap::hydrate(self, &mut state).await;
        }

        let mut memo = TurnMemo::default();
        let mut occ_attempt: u32 = 0;

        let (final_state, outcome) = loop {
            let mut working = state.clone();
            working.last_user_text = Some(msg.text.clone());

            let pending = self.pending.get_staged(session_id).await?;
            let route =
                router::route(self, &mut working, pending.as_ref(), &msg.text).await?;
            let mut sub = subgraphs::dispatch(
                self,
                &mut working,
                route,
                &msg.text,
                &msg.message_id,
                &mut memo,
            )
            .await?;

            // Continuation is bounded to one hop per turn.
            if let Some(Reroute::Auxiliar) = sub.reroute {
                sub = auxiliar::handle(&working);
            }

            working.last_reply_code = Some(sub.outcome.as_str().to_string());

            match self.sessions.save(&working, version).await {
                Ok(_next) => break (working, sub.outcome),
                Err(AppError::Conflict(reason)) => {
                    occ_attempt += 1;
                    if occ_attempt >= OCC_ATTEMPTS {
                        return Err(AppError::Conflict(reason));
                    }
                    warn!(occ_attempt, %reason, "occ conflict; reloading and replaying");
                    tokio::time::sleep(std::time::Duration::from_millis(jitter_ms(20, 80)))
                        .await;
                    let reloaded = self.sessions.load(&msg.phone_number).await?;
                    state = reloaded.0;
                    version = reloaded.1;
                }
                Err(err) => return Err(err),
            }
        };

        let reply = consolidator::consolidate(self, &final_state, outcome).await;

        let mut inbound = BufferEntry::inbound(session_id, &msg.message_id, &msg.text);
        inbound.meta.clone_from(&msg.meta);
        self.buffer.append(&inbound).await?;
        self.buffer
            .append(&BufferEntry::outbound(session_id, outcome.as_str(), &reply))
            .await?;

        let body = serialize_response(&IngestResponse {
            reply,
            session_id: session_id.to_string(),
            status: "success".to_string(),
            outcome_code: outcome.as_str().to_string(),
        });

        // Recorded before the lock is released so a retried delivery
        // replays this exact reply.
        if let Err(err) = self.idempotency.put(key, 200, &body).await {
            warn!(%err, "failed to record idempotent response");
        }

        Ok((200, body))
    }
}

/// Hints delivered by the gateway's template-fired hook.
#[derive(Debug, Clone, Default)]
pub struct TemplateHints {
    /// Caregiver phone number.
    pub phone_number: String,
    /// Template name the gateway sent.
    pub template: String,
    /// The template told the caregiver the shift is ready to close.
    pub finish_reminder_sent: Option<bool>,
    /// Shift day the template refers to; a change signals a new shift.
    pub shift_day: Option<String>,
    /// Fields the template asked the caregiver for.
    pub missing_fields_hint: Option<Vec<String>>,
}

impl Engine {
    /// Merge template-fired hints into the session under the lock.
    ///
    /// # Errors
    ///
    /// Returns `AppError::LockDenied` when the session is busy and
    /// `AppError::Conflict` when the OCC budget is exhausted.
    pub async fn apply_template_hints(&self, hints: TemplateHints) -> Result<String> {
        let session_id = canonical_phone(&hints.phone_number);
        if session_id.is_empty() {
            return Err(AppError::Input("phoneNumber has no digits".into()));
        }

        let owner = format!("{}:{}", self.worker_id, Uuid::new_v4());
        if !self.acquire_lock(&session_id, &owner).await {
            return Err(AppError::LockDenied(format!("session {session_id} busy")));
        }
        let renewal = self.spawn_lease_renewal(&session_id, &owner);

        let result = self.apply_hints_locked(&session_id, &hints).await;
        renewal.abort();
        if let Err(err) = self.locks.release(&session_id, &owner).await {
            warn!(%err, "lock release failed; lease will expire");
        }
        result
    }

    async fn apply_hints_locked(&self, session_id: &str, hints: &TemplateHints) -> Result<String> {
        let mut occ_attempt: u32 = 0;
        loop {
            let (mut state, version) = self.sessions.load(&hints.phone_number).await?;

            let new_shift = hints
                .shift_day
                .as_deref()
                .is_some_and(|day| state.shift_day.as_deref() != Some(day));
            if new_shift || bootstrap::needs_hydration(&state, version) {
                bootstrap::hydrate(self, &mut state).await;
            }
            if let Some(finish) = hints.finish_reminder_sent {
                state.finish_reminder_sent = finish;
            }

            match self.sessions.save(&state, version).await {
                Ok(_) => {
                    let mut entry = BufferEntry::outbound(
                        session_id,
                        "template_fired",
                        &hints.template,
                    );
                    entry.meta = Some(serde_json::json!({
                        "finishReminderSent": hints.finish_reminder_sent,
                        "shiftDay": hints.shift_day,
                        "hint_campos_faltantes": hints.missing_fields_hint,
                    }));
                    self.buffer.append(&entry).await?;
                    return Ok(session_id.to_string());
                }
                Err(AppError::Conflict(reason)) => {
                    occ_attempt += 1;
                    if occ_attempt >= OCC_ATTEMPTS {
                        return Err(AppError::Conflict(reason));
                    }
                    tokio::time::sleep(std::time::Duration::from_millis(jitter_ms(20, 80)))
                        .await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn respond(
    state: &SessionState,
    outcome: OutcomeCode,
    status_code: u16,
    status: &str,
) -> (u16, String) {
    let body = serialize_response(&IngestResponse {
        reply: consolidator::template(state, outcome),
        session_id: state.session_id.clone(),
        status: status.to_string(),
        outcome_code: outcome.as_str().to_string(),
    });
    (status_code, body)
}

fn serialize_response(response: &IngestResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|_| {
        // The response struct contains only strings; serialization
        // cannot fail in practice.
        String::from("{\"reply\":\"\",\"sessionId\":\"\",\"status\":\"error\",\"outcomeCode\":\"input_error\"}")
    })
}

fn jitter_ms(low: u64, high: u64) -> u64 {
    rand::thread_rng().gen_range(low..high)
}
