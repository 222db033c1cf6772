//! Session-scoped orchestration engine.
//!
//! One [`Engine`] instance is constructed at startup and shared by the
//! HTTP layer. All collaborators are injected here; nothing else holds
//! process-wide state.

pub mod bootstrap;
pub mod consolidator;
pub mod pipeline;
pub mod router;
pub mod subgraphs;

use std::sync::Arc;

use uuid::Uuid;

use crate::backend::client::BackendClient;
use crate::backend::webhook::WorkflowWebhook;
use crate::clinical::extractor::ClinicalExtractor;
use crate::config::GlobalConfig;
use crate::llm::gateway::LlmGateway;
use crate::persistence::buffer_repo::BufferRepo;
use crate::persistence::db::Database;
use crate::persistence::idempotency_repo::IdempotencyRepo;
use crate::persistence::lock_repo::LockRepo;
use crate::persistence::pending_repo::PendingRepo;
use crate::persistence::session_repo::SessionRepo;
use crate::Result;

/// Dependency-injected orchestration engine.
pub struct Engine {
    pub(crate) config: Arc<GlobalConfig>,
    pub(crate) db: Arc<Database>,
    pub(crate) sessions: SessionRepo,
    pub(crate) pending: PendingRepo,
    pub(crate) buffer: BufferRepo,
    pub(crate) locks: LockRepo,
    pub(crate) idempotency: IdempotencyRepo,
    pub(crate) llm: LlmGateway,
    pub(crate) backend: BackendClient,
    pub(crate) webhook: WorkflowWebhook,
    pub(crate) clinical: ClinicalExtractor,
    /// Lock-owner prefix identifying this process instance.
    pub(crate) worker_id: String,
}

impl Engine {
    /// Wire the engine from configuration and a connected database.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if an HTTP client or extraction
    /// pattern fails to build.
    pub fn new(config: Arc<GlobalConfig>, db: Arc<Database>) -> Result<Self> {
        Ok(Self {
            sessions: SessionRepo::new(Arc::clone(&db)),
            pending: PendingRepo::new(Arc::clone(&db)),
            buffer: BufferRepo::new(Arc::clone(&db)),
            locks: LockRepo::new(Arc::clone(&db)),
            idempotency: IdempotencyRepo::new(Arc::clone(&db)),
            llm: LlmGateway::new(&config.llm)?,
            backend: BackendClient::new(&config.backend)?,
            webhook: WorkflowWebhook::new(&config.backend)?,
            clinical: ClinicalExtractor::new()?,
            worker_id: format!("worker-{}", Uuid::new_v4()),
            config,
            db,
        })
    }

    /// Shared database handle, for readiness probes.
    #[must_use]
    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    /// Backend client, for readiness probes.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.backend
    }

    /// Session repository, for the debug read path.
    #[must_use]
    pub fn sessions(&self) -> &SessionRepo {
        &self.sessions
    }

    /// Buffer repository, for the debug read path.
    #[must_use]
    pub fn conversation_buffer(&self) -> &BufferRepo {
        &self.buffer
    }

    /// Lock repository, for graceful-shutdown lease release.
    #[must_use]
    pub fn locks(&self) -> &LockRepo {
        &self.locks
    }

    /// Pending-action repository, for the startup recovery check.
    #[must_use]
    pub fn pending_actions(&self) -> &PendingRepo {
        &self.pending
    }

    /// Lock-owner prefix identifying this process instance.
    #[must_use]
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }
}
