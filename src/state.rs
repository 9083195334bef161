use sqlx::PgPool;
use std::sync::Arc;

use crate::auth::{Argon2Verifier, TokenCodec};
use crate::config::{AppConfig, ConfigError};
use crate::database::{DatabaseManager, TaskRepository, UserRepository};
use crate::services::{AuthService, TaskService};

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pool: PgPool,
    pub tokens: TokenCodec,
    pub auth: Arc<AuthService>,
    pub tasks: Arc<TaskService>,
}

impl AppState {
    /// Wire services over a lazily connecting pool. Fails only on
    /// configuration problems; the database is not contacted.
    pub fn new(config: AppConfig) -> Result<Self, ConfigError> {
        let pool = DatabaseManager::lazy_pool(&config.database);
        Self::with_pool(config, pool)
    }

    pub fn with_pool(config: AppConfig, pool: PgPool) -> Result<Self, ConfigError> {
        let tokens = TokenCodec::new(&config.security.jwt_secret)?;

        let auth = AuthService::new(
            Arc::new(UserRepository::new(pool.clone())),
            Arc::new(Argon2Verifier),
            tokens.clone(),
            config.jwt_ttl(),
        );
        let tasks = TaskService::new(Arc::new(TaskRepository::new(pool.clone())));

        Ok(Self {
            config: Arc::new(config),
            pool,
            tokens,
            auth: Arc::new(auth),
            tasks: Arc::new(tasks),
        })
    }
}
