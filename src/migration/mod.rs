// migration/mod.rs - Applies registered table definitions to a database
//
// Ordering: stable sort by creation priority, so parents referenced by a
// foreign key are created before their children and equal priorities keep
// registration order.
//
// Failure isolation: a failing table is recorded and the run continues. Only
// failing to open the connection aborts the run.

pub mod ddl;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::postgres::PgConnection;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::DatabaseConfig;
use crate::database::{DatabaseError, DatabaseManager};
use crate::schema::{SchemaRegistry, TableDefinition};

pub use ddl::create_table_statement;

/// Anything that can execute one DDL statement.
#[async_trait]
pub trait SchemaExecutor: Send {
    async fn execute(&mut self, statement: &str) -> Result<(), DatabaseError>;
}

#[async_trait]
impl SchemaExecutor for PgConnection {
    async fn execute(&mut self, statement: &str) -> Result<(), DatabaseError> {
        sqlx::query(statement).execute(&mut *self).await?;
        Ok(())
    }
}

/// Fatal migration errors. Per-table problems never surface here.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Cannot connect to database for migration: {0}")]
    Connection(#[from] DatabaseError),
}

/// One table that could not be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("Failed to create table {table}: {message}")]
pub struct TableCreationError {
    pub table: String,
    pub message: String,
}

/// Outcome of one migration run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Tables whose statement succeeded, in the order applied.
    pub created: Vec<String>,
    pub failed: Vec<TableCreationError>,
}

impl MigrationReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failure(&self, table: &str) -> Option<&str> {
        self.failed
            .iter()
            .find(|f| f.table == table)
            .map(|f| f.message.as_str())
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for table in &self.created {
            writeln!(f, "created  {}", table)?;
        }
        for failure in &self.failed {
            writeln!(f, "FAILED   {}: {}", failure.table, failure.message)?;
        }
        write!(
            f,
            "{} created, {} failed",
            self.created.len(),
            self.failed.len()
        )
    }
}

/// A statement the migrator would run for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedStatement {
    pub table: String,
    pub statement: String,
}

pub struct Migrator<'a> {
    registry: &'a SchemaRegistry,
    statement_timeout: Option<Duration>,
}

impl<'a> Migrator<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self {
            registry,
            statement_timeout: None,
        }
    }

    /// Bound each statement; an elapsed statement counts as a table failure.
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = Some(timeout);
        self
    }

    /// Definitions in the order they will be applied.
    pub fn ordered(&self) -> Vec<&'a TableDefinition> {
        let mut definitions: Vec<&TableDefinition> = self.registry.definitions().iter().collect();
        // `sort_by_key` is stable; ties keep registration order.
        definitions.sort_by_key(|d| d.creation_priority);
        definitions
    }

    pub fn plan(&self) -> Vec<PlannedStatement> {
        self.ordered()
            .into_iter()
            .map(|d| PlannedStatement {
                table: d.table_name.to_string(),
                statement: create_table_statement(d),
            })
            .collect()
    }

    /// Open a connection from `config` and apply every definition.
    pub async fn run(&self, config: &DatabaseConfig) -> Result<MigrationReport, MigrationError> {
        let mut conn = DatabaseManager::connect(config).await.map_err(|e| {
            error!("Cannot connect to database for migration: {}", e);
            e
        })?;

        Ok(self.apply(&mut conn).await)
    }

    /// Apply every definition over `executor`, isolating per-table failures.
    pub async fn apply<E>(&self, executor: &mut E) -> MigrationReport
    where
        E: SchemaExecutor + ?Sized,
    {
        let mut report = MigrationReport::default();

        for definition in self.ordered() {
            let table = definition.table_name;

            if let Some(violation) = self.registry.reference_violation(definition) {
                warn!("Skipping table {}: {}", table, violation);
                report.failed.push(TableCreationError {
                    table: table.to_string(),
                    message: violation.to_string(),
                });
                continue;
            }

            let statement = create_table_statement(definition);
            info!("Creating table: {}", table);

            match self.execute(executor, &statement).await {
                Ok(()) => {
                    info!("Table created: {}", table);
                    report.created.push(table.to_string());
                }
                Err(e) => {
                    error!("Failed to create table {}: {}", table, e);
                    report.failed.push(TableCreationError {
                        table: table.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Migrations finished: {} created, {} failed",
            report.created.len(),
            report.failed.len()
        );
        report
    }

    async fn execute<E>(&self, executor: &mut E, statement: &str) -> Result<(), DatabaseError>
    where
        E: SchemaExecutor + ?Sized,
    {
        match self.statement_timeout {
            Some(limit) => tokio::time::timeout(limit, executor.execute(statement))
                .await
                .map_err(|_| DatabaseError::Timeout(limit))?,
            None => executor.execute(statement).await,
        }
    }
}
