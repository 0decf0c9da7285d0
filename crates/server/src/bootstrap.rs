use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;

use grantline_agent::extractor::{IntentExtractor, LlmIntentExtractor};
use grantline_agent::llm::GeminiClient;
use grantline_agent::runtime::AgentRuntime;
use grantline_core::config::{AppConfig, ConfigError, LoadOptions};
use grantline_core::domain::session::SessionId;
use grantline_db::repositories::{
    SqlConsultationRepository, SqlMessageRepository, SqlSessionRepository, SqlUserRepository,
};
use grantline_db::{
    connect, migrations, ConsultationRepository, DbPool, MessageRepository, SessionRepository,
    UserRepository,
};

/// Shared handles every request handler needs. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub consultations: Arc<dyn ConsultationRepository>,
    pub runtime: Arc<AgentRuntime<Box<dyn IntentExtractor>>>,
    pub locks: SessionLocks,
}

/// Per-session turn serialization. Two concurrent chat requests against the
/// same session would otherwise race on load-mutate-save of the record.
#[derive(Clone, Default)]
pub struct SessionLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl SessionLocks {
    pub async fn acquire(&self, session_id: &SessionId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            // An entry whose only reference is the map itself has no guard
            // outstanding and no waiter; drop it so the map stays bounded
            // by the number of in-flight sessions.
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            map.entry(session_id.0.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

pub struct Application {
    pub state: AppState,
    pub db_pool: DbPool,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("llm client initialization failed: {0}")]
    LlmClient(#[source] anyhow::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let client = GeminiClient::from_config(&config.llm).map_err(BootstrapError::LlmClient)?;
    let extractor: Box<dyn IntentExtractor> = Box::new(LlmIntentExtractor::new(client));

    let state = AppState {
        config: Arc::new(config),
        users: Arc::new(SqlUserRepository::new(db_pool.clone())),
        sessions: Arc::new(SqlSessionRepository::new(db_pool.clone())),
        messages: Arc::new(SqlMessageRepository::new(db_pool.clone())),
        consultations: Arc::new(SqlConsultationRepository::new(db_pool.clone())),
        runtime: Arc::new(AgentRuntime::new(extractor)),
        locks: SessionLocks::default(),
    };

    Ok(Application { state, db_pool })
}
