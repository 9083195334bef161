use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use tracing::debug;

use crate::database::manager::DatabaseError;
use crate::database::models::{NewTask, NewUser, Task, User};
use crate::services::auth_service::CredentialStore;

const USER_COLUMNS: &str = "id, email, firstname, lastname, password, created_at";
const TASK_COLUMNS: &str =
    "id, title, description, is_completed, user_id, created_at, due_date, completed_at";

/// sqlx-backed access to the `users` table.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for UserRepository {
    async fn create(&self, new_user: NewUser) -> Result<User, DatabaseError> {
        let sql = format!(
            "INSERT INTO users (email, firstname, lastname, password) VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&new_user.email)
            .bind(&new_user.firstname)
            .bind(&new_user.lastname)
            .bind(&new_user.password_digest)
            .fetch_one(&self.pool)
            .await?;

        debug!("Inserted user {}", user.id);
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}

/// sqlx-backed access to the `tasks` table.
#[derive(Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new_task: NewTask) -> Result<Task, DatabaseError> {
        let sql = format!(
            "INSERT INTO tasks (title, description, user_id, due_date) VALUES ($1, $2, $3, $4) RETURNING {}",
            TASK_COLUMNS
        );
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(&new_task.title)
            .bind(&new_task.description)
            .bind(new_task.user_id)
            .bind(new_task.due_date)
            .fetch_one(&self.pool)
            .await?;

        debug!("Inserted task {} for user {}", task.id, task.user_id);
        Ok(task)
    }

    /// All tasks owned by `user_id`, optionally only those due on `due_on`
    /// (calendar day in UTC).
    pub async fn list_for_user(
        &self,
        user_id: i32,
        due_on: Option<NaiveDate>,
    ) -> Result<Vec<Task>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM tasks \
             WHERE user_id = $1 \
             AND ($2::date IS NULL OR (due_date AT TIME ZONE 'UTC')::date = $2) \
             ORDER BY created_at, id",
            TASK_COLUMNS
        );
        let tasks = sqlx::query_as::<_, Task>(&sql)
            .bind(user_id)
            .bind(due_on)
            .fetch_all(&self.pool)
            .await?;
        Ok(tasks)
    }

    pub async fn find(&self, id: i32) -> Result<Option<Task>, DatabaseError> {
        let sql = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    pub async fn mark_completed(
        &self,
        id: i32,
        completed_at: DateTime<Utc>,
    ) -> Result<Task, DatabaseError> {
        let sql = format!(
            "UPDATE tasks SET is_completed = TRUE, completed_at = $2 WHERE id = $1 RETURNING {}",
            TASK_COLUMNS
        );
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(completed_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(task)
    }
}
