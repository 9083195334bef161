// Shared fakes for unit tests.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::{ApiConfig, AppConfig, DatabaseConfig, Environment, SecurityConfig};
use crate::database::models::{NewTask, NewUser, Task, User};
use crate::database::DatabaseError;
use crate::migration::SchemaExecutor;
use crate::services::{CredentialStore, TaskStore};

pub const TEST_SECRET: &str = "test-secret-test-secret-test-secret!";

/// Configuration pointing at a port nothing listens on.
pub fn test_config() -> AppConfig {
    AppConfig {
        environment: Environment::Development,
        database: DatabaseConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            name: "tasks_test".to_string(),
            user: "tester".to_string(),
            password: "secret".to_string(),
            max_connections: 1,
            connect_timeout_secs: 1,
            statement_timeout_secs: 1,
        },
        api: ApiConfig {
            port: 0,
            enable_request_logging: false,
            max_request_size_bytes: 64 * 1024,
        },
        security: SecurityConfig {
            jwt_secret: TEST_SECRET.to_string(),
            jwt_expiry_hours: 1,
            enable_cors: false,
        },
    }
}

/// In-memory stand-in for a database that understands just enough of
/// `CREATE TABLE IF NOT EXISTS` to exercise the migrator.
#[derive(Default)]
pub struct MemoryExecutor {
    tables: BTreeMap<String, String>,
    executed: Vec<String>,
    fail_on: Vec<String>,
    delay: Option<Duration>,
}

impl MemoryExecutor {
    /// Reject any statement containing `pattern`, like a database rejecting
    /// an unknown type.
    pub fn failing_on(mut self, pattern: &str) -> Self {
        self.fail_on.push(pattern.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn tables(&self) -> &BTreeMap<String, String> {
        &self.tables
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Table names of every statement received, in order.
    pub fn executed_tables(&self) -> Vec<String> {
        self.executed.clone()
    }
}

fn table_name(statement: &str) -> Option<&str> {
    statement
        .strip_prefix("CREATE TABLE IF NOT EXISTS ")?
        .split_whitespace()
        .next()
}

fn referenced_tables(statement: &str) -> Vec<&str> {
    statement
        .split("REFERENCES ")
        .skip(1)
        .filter_map(|rest| rest.split('(').next())
        .collect()
}

#[async_trait]
impl SchemaExecutor for MemoryExecutor {
    async fn execute(&mut self, statement: &str) -> Result<(), DatabaseError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let table = table_name(statement)
            .ok_or_else(|| DatabaseError::Connection("unsupported statement".to_string()))?
            .to_string();
        self.executed.push(table.clone());

        if let Some(pattern) = self.fail_on.iter().find(|p| statement.contains(p.as_str())) {
            return Err(DatabaseError::Conflict(format!(
                "syntax error at or near \"{}\"",
                pattern
            )));
        }

        for referenced in referenced_tables(statement) {
            if referenced != table && !self.tables.contains_key(referenced) {
                return Err(DatabaseError::NotFound(format!(
                    "relation \"{}\" does not exist",
                    referenced
                )));
            }
        }

        self.tables.entry(table).or_insert_with(|| statement.to_string());
        Ok(())
    }
}

/// In-memory user table.
#[derive(Default)]
pub struct MemoryCredentialStore {
    users: Mutex<Vec<User>>,
}

impl MemoryCredentialStore {
    pub fn len(&self) -> usize {
        self.users.lock().map(|u| u.len()).unwrap_or(0)
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create(&self, new_user: NewUser) -> Result<User, DatabaseError> {
        let mut users = self.users.lock().expect("store lock poisoned");
        if users.iter().any(|u| u.email == new_user.email) {
            return Err(DatabaseError::Conflict("duplicate key value violates unique constraint".to_string()));
        }
        let user = User {
            id: users.len() as i32 + 1,
            email: new_user.email,
            firstname: new_user.firstname,
            lastname: new_user.lastname,
            password: new_user.password_digest,
            created_at: Utc::now(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let users = self.users.lock().expect("store lock poisoned");
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, DatabaseError> {
        let users = self.users.lock().expect("store lock poisoned");
        Ok(users.iter().find(|u| u.id == id).cloned())
    }
}

/// In-memory task table; ids are assigned in insertion order.
#[derive(Default)]
pub struct MemoryTaskStore {
    tasks: Mutex<Vec<Task>>,
}

impl MemoryTaskStore {
    pub fn len(&self) -> usize {
        self.tasks.lock().map(|t| t.len()).unwrap_or(0)
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn create(&self, new_task: NewTask) -> Result<Task, DatabaseError> {
        let mut tasks = self.tasks.lock().expect("store lock poisoned");
        let task = Task {
            id: tasks.len() as i32 + 1,
            title: new_task.title,
            description: new_task.description,
            is_completed: false,
            user_id: new_task.user_id,
            created_at: Utc::now(),
            due_date: Some(new_task.due_date),
            completed_at: None,
        };
        tasks.push(task.clone());
        Ok(task)
    }

    async fn list_for_user(
        &self,
        user_id: i32,
        due_on: Option<NaiveDate>,
    ) -> Result<Vec<Task>, DatabaseError> {
        let tasks = self.tasks.lock().expect("store lock poisoned");
        Ok(tasks
            .iter()
            .filter(|t| t.user_id == user_id)
            .filter(|t| match due_on {
                Some(day) => t.due_date.map(|d| d.date_naive()) == Some(day),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn find(&self, id: i32) -> Result<Option<Task>, DatabaseError> {
        let tasks = self.tasks.lock().expect("store lock poisoned");
        Ok(tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn mark_completed(&self, id: i32, completed_at: DateTime<Utc>) -> Result<Task, DatabaseError> {
        let mut tasks = self.tasks.lock().expect("store lock poisoned");
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| DatabaseError::NotFound("Record not found".to_string()))?;
        task.is_completed = true;
        task.completed_at = Some(completed_at);
        Ok(task.clone())
    }
}
