#![forbid(unsafe_code)]

//! `shift-orchestrator` — turns caregiver WhatsApp messages into a
//! bounded set of business actions against the home-care shift
//! platform: attendance, clinical vitals, operational notes and shift
//! finalization. One long-lived session per phone number, serialized by
//! a per-session lock and versioned with optimistic concurrency.

pub mod backend;
pub mod clinical;
pub mod config;
pub mod engine;
pub mod errors;
pub mod http;
pub mod llm;
pub mod models;
pub mod persistence;

pub use errors::{AppError, Result};
