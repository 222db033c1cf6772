//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Persistence failure when interacting with `SQLite`.
    Db(String),
    /// Malformed or unintelligible inbound request.
    Input(String),
    /// LLM provider unreachable or circuit open.
    LlmUnavailable(String),
    /// Backend call failed with a retryable condition.
    BackendTransient(String),
    /// Backend call failed with a non-retryable condition.
    BackendPermanent(String),
    /// Optimistic-concurrency conflict on a conditional session write.
    Conflict(String),
    /// Per-session lock could not be acquired within the retry budget.
    LockDenied(String),
    /// Per-request deadline or per-call timeout elapsed.
    Timeout(String),
    /// Requested entity does not exist.
    NotFound(String),
    /// Internal invariant violated; bug-class condition.
    Invariant(String),
}

impl AppError {
    /// Whether a caller may retry the failed operation as-is.
    ///
    /// `Conflict` is excluded: it requires a reload-and-replay, not a
    /// blind retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::BackendTransient(_) | Self::LockDenied(_) | Self::Timeout(_) | Self::Db(_)
        )
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Db(msg) => write!(f, "db: {msg}"),
            Self::Input(msg) => write!(f, "input: {msg}"),
            Self::LlmUnavailable(msg) => write!(f, "llm unavailable: {msg}"),
            Self::BackendTransient(msg) => write!(f, "backend transient: {msg}"),
            Self::BackendPermanent(msg) => write!(f, "backend permanent: {msg}"),
            Self::Conflict(msg) => write!(f, "conflict: {msg}"),
            Self::LockDenied(msg) => write!(f, "lock denied: {msg}"),
            Self::Timeout(msg) => write!(f, "timeout: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Invariant(msg) => write!(f, "invariant violation: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Db(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::BackendTransient(err.to_string())
        }
    }
}
