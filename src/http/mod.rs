//! HTTP ingress: webhook endpoints, template hook, health and debug
//! read paths.

pub mod health;
pub mod hooks;
pub mod ingress;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::engine::Engine;
use crate::{AppError, Result};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The orchestration engine.
    pub engine: Arc<Engine>,
}

/// Build the ingress router.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/webhook/ingest", post(ingress::ingest))
        .route("/hooks/template-fired", post(hooks::template_fired))
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/debug/sessions/{phone}", get(health::debug_session))
        .with_state(state)
}

/// Serve the ingress until the token is cancelled.
///
/// # Errors
///
/// Returns `AppError::Config` if the server fails to bind.
pub async fn serve(state: AppState, port: u16, ct: CancellationToken) -> Result<()> {
    let bind = SocketAddr::from(([0, 0, 0, 0], port));
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Config(format!("failed to bind ingress on {bind}: {err}")))?;

    info!(%bind, "starting HTTP ingress");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            ct.cancelled().await;
        })
        .await
        .map_err(|err| AppError::Config(format!("ingress server error: {err}")))?;

    info!("HTTP ingress shut down");
    Ok(())
}
