use sqlx::postgres::{PgConnectOptions, PgConnection, PgPool, PgPoolOptions};
use sqlx::ConnectOptions;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from database access
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Cannot connect to database: {0}")]
    Connection(String),

    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(e) => DatabaseError::Connection(e.to_string()),
            sqlx::Error::Tls(e) => DatabaseError::Connection(e.to_string()),
            sqlx::Error::PoolTimedOut => {
                DatabaseError::Connection("timed out waiting for a pooled connection".to_string())
            }
            sqlx::Error::PoolClosed => DatabaseError::Connection("pool closed".to_string()),
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                DatabaseError::Conflict(db.message().to_string())
            }
            other => DatabaseError::Sqlx(other),
        }
    }
}

/// Opens connections and pools from the immutable database configuration.
pub struct DatabaseManager;

impl DatabaseManager {
    pub fn connect_options(config: &DatabaseConfig) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.name)
            .username(&config.user)
            .password(&config.password)
    }

    /// Open a single dedicated connection, bounded by the connect timeout.
    pub async fn connect(config: &DatabaseConfig) -> Result<PgConnection, DatabaseError> {
        let options = Self::connect_options(config);
        let conn = tokio::time::timeout(config.connect_timeout(), options.connect())
            .await
            .map_err(|_| DatabaseError::Timeout(config.connect_timeout()))?
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        info!(
            "Connected to database '{}' at {}:{}",
            config.name, config.host, config.port
        );
        Ok(conn)
    }

    /// Build the request-serving pool without connecting; connections are
    /// opened on first use so the server can start while the database is down.
    pub fn lazy_pool(config: &DatabaseConfig) -> PgPool {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout())
            .connect_lazy_with(Self::connect_options(config))
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }
}
