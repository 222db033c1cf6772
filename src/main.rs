#![forbid(unsafe_code)]

//! `shift-orchestrator` — server binary.
//!
//! Bootstraps configuration, the state stores, the orchestration engine
//! and the HTTP ingress, then runs until a shutdown signal arrives.

use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use shift_orchestrator::config::GlobalConfig;
use shift_orchestrator::engine::Engine;
use shift_orchestrator::http::{self, AppState};
use shift_orchestrator::persistence::{db, retention};
use shift_orchestrator::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "shift-orchestrator",
    about = "WhatsApp conversational orchestrator for home-care shifts",
    version,
    long_about = None
)]
struct Cli {
    /// Override the HTTP port from the environment.
    #[arg(long)]
    port: Option<u16>,

    /// Override the SQLite database path from the environment.
    #[arg(long)]
    db: Option<String>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::from_env()?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    if let Some(db_path) = args.db {
        config.db_path = db_path;
    }

    init_tracing(args.log_format, &config.log_level)?;
    info!("shift-orchestrator server bootstrap");

    let config = Arc::new(config);
    info!("configuration loaded");

    // ── Initialize database ─────────────────────────────
    let db = Arc::new(db::connect(&config.db_path).await?);
    info!("database connected");

    // ── Start retention service ─────────────────────────
    let ct = CancellationToken::new();
    let retention_handle = retention::spawn_retention_task(Arc::clone(&db), ct.clone());
    info!("retention service started");

    // ── Build the engine ────────────────────────────────
    let engine = Arc::new(Engine::new(Arc::clone(&config), Arc::clone(&db))?);
    info!(worker_id = engine.worker_id(), "engine wired");

    // ── Startup recovery check ──────────────────────────
    check_expired_pending_on_startup(&engine).await;

    // ── Start ingress ───────────────────────────────────
    let state = AppState {
        engine: Arc::clone(&engine),
    };
    let http_ct = ct.clone();
    let http_shutdown_ct = ct.clone();
    let port = config.http_port;
    let http_handle = tokio::spawn(async move {
        if let Err(err) = http::serve(state, port, http_ct).await {
            error!(%err, "ingress failed — initiating shutdown");
            http_shutdown_ct.cancel();
        }
    });

    info!(port, "server ready");

    // ── Wait for first shutdown signal ──────────────────
    shutdown_signal().await;
    info!("shutdown signal received — starting graceful shutdown");
    ct.cancel();

    // Spawn a background listener for a second Ctrl+C (force-exit).
    tokio::spawn(async {
        shutdown_signal().await;
        error!("second shutdown signal received — forcing exit");
        std::process::exit(1);
    });

    // ── Graceful shutdown with timeout ──────────────────
    shutdown_with_timeout(&engine, http_handle, retention_handle).await;

    info!("shift-orchestrator shut down");
    Ok(())
}

/// Maximum time to wait for graceful shutdown before force-exiting.
const SHUTDOWN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Run the graceful shutdown sequence with a timeout.
///
/// Releases session-lock leases held by this process and waits for the
/// ingress and retention handles. If the sequence exceeds
/// [`SHUTDOWN_TIMEOUT`], it logs an error and returns immediately.
async fn shutdown_with_timeout(
    engine: &Engine,
    http_handle: tokio::task::JoinHandle<()>,
    retention_handle: tokio::task::JoinHandle<()>,
) {
    let shutdown_fut = async {
        match engine.locks().release_all_for_owner(engine.worker_id()).await {
            Ok(released) if released > 0 => {
                info!(released, "released session lock leases");
            }
            Ok(_) => {}
            Err(err) => error!(%err, "failed to release lock leases"),
        }

        let _ = http_handle.await;
        let _ = retention_handle.await;
    };

    if tokio::time::timeout(SHUTDOWN_TIMEOUT, shutdown_fut)
        .await
        .is_err()
    {
        error!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "graceful shutdown timed out — exiting"
        );
    }
}

/// Count staged pending actions that expired while the process was
/// down and log them for the operations team.
async fn check_expired_pending_on_startup(engine: &Engine) {
    let _span = tracing::info_span!("startup_recovery_check").entered();

    match engine.pending_actions().count_expired_staged().await {
        Ok(0) => info!("no expired staged actions found on startup"),
        Ok(count) => info!(count, "found expired staged actions on startup"),
        Err(err) => error!(%err, "startup recovery check failed"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat, default_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
