//! Backend adapter: circuit breaker, the four shift-platform endpoints,
//! the note-fetch endpoint and the workflow webhook.

pub mod breaker;
pub mod client;
pub mod types;
pub mod webhook;
