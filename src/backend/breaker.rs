//! Per-endpoint circuit breaker.
//!
//! Closed → open after `threshold` consecutive failures; open → half-open
//! after the cool-down, admitting a single probe; the probe's result
//! closes or re-opens the circuit. All state is atomic — the only
//! process-wide mutable state outside the stores.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::time::Duration;

use chrono::Utc;

/// Consecutive failures before the circuit opens.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// Cool-down before a half-open probe is admitted.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

/// Circuit breaker guarding one endpoint.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: &'static str,
    threshold: u32,
    cooldown_ms: i64,
    consecutive_failures: AtomicU32,
    opened_at_ms: AtomicI64,
    probing: AtomicBool,
}

impl CircuitBreaker {
    /// Create a breaker with the default threshold and cool-down.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self::with_policy(name, DEFAULT_FAILURE_THRESHOLD, DEFAULT_COOLDOWN)
    }

    /// Create a breaker with an explicit threshold and cool-down.
    #[must_use]
    pub fn with_policy(name: &'static str, threshold: u32, cooldown: Duration) -> Self {
        Self {
            name,
            threshold,
            cooldown_ms: i64::try_from(cooldown.as_millis()).unwrap_or(i64::MAX),
            consecutive_failures: AtomicU32::new(0),
            opened_at_ms: AtomicI64::new(0),
            probing: AtomicBool::new(false),
        }
    }

    /// Endpoint name the breaker guards.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether a call may proceed.
    ///
    /// While open, returns `false` until the cool-down elapses, then
    /// admits exactly one half-open probe.
    pub fn allow(&self) -> bool {
        let opened_at = self.opened_at_ms.load(Ordering::Acquire);
        if opened_at == 0 {
            return true;
        }

        let now = Utc::now().timestamp_millis();
        if now < opened_at.saturating_add(self.cooldown_ms) {
            return false;
        }

        // Cool-down elapsed: admit a single probe.
        self.probing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Record a successful call, closing the circuit.
    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Release);
        self.opened_at_ms.store(0, Ordering::Release);
        self.probing.store(false, Ordering::Release);
    }

    /// Record a failed call, opening the circuit at the threshold or
    /// re-opening it after a failed probe.
    pub fn record_failure(&self) {
        let was_probing = self.probing.swap(false, Ordering::AcqRel);
        let now = Utc::now().timestamp_millis();

        if was_probing && self.opened_at_ms.load(Ordering::Acquire) != 0 {
            self.opened_at_ms.store(now, Ordering::Release);
            return;
        }

        let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
        if failures >= self.threshold {
            self.opened_at_ms.store(now, Ordering::Release);
        }
    }

    /// Whether the circuit is currently open (cool-down not yet elapsed
    /// or awaiting a probe result).
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.opened_at_ms.load(Ordering::Acquire) != 0
    }
}
