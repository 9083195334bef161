// services/task_service.rs - Task creation, listing and completion for one owner

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use validator::Validate;

use crate::database::models::{NewTask, Task, TaskBuckets};
use crate::database::{DatabaseError, TaskRepository};
use crate::services::{field_errors, not_blank};

/// Persistence for tasks.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create(&self, new_task: NewTask) -> Result<Task, DatabaseError>;

    async fn list_for_user(
        &self,
        user_id: i32,
        due_on: Option<NaiveDate>,
    ) -> Result<Vec<Task>, DatabaseError>;

    async fn find(&self, id: i32) -> Result<Option<Task>, DatabaseError>;

    async fn mark_completed(&self, id: i32, completed_at: DateTime<Utc>) -> Result<Task, DatabaseError>;
}

#[async_trait]
impl TaskStore for TaskRepository {
    async fn create(&self, new_task: NewTask) -> Result<Task, DatabaseError> {
        TaskRepository::create(self, new_task).await
    }

    async fn list_for_user(
        &self,
        user_id: i32,
        due_on: Option<NaiveDate>,
    ) -> Result<Vec<Task>, DatabaseError> {
        TaskRepository::list_for_user(self, user_id, due_on).await
    }

    async fn find(&self, id: i32) -> Result<Option<Task>, DatabaseError> {
        TaskRepository::find(self, id).await
    }

    async fn mark_completed(&self, id: i32, completed_at: DateTime<Utc>) -> Result<Task, DatabaseError> {
        TaskRepository::mark_completed(self, id, completed_at).await
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(
        length(min = 1, max = 255, message = "Title must be between 1 and 255 characters."),
        custom(function = "not_blank", message = "Title cannot be empty.")
    )]
    #[serde(default)]
    pub title: String,

    #[validate(
        length(min = 1, max = 1000, message = "Description must be between 1 and 1000 characters."),
        custom(function = "not_blank", message = "Description cannot be empty.")
    )]
    #[serde(default)]
    pub description: String,

    #[validate(required(message = "Date cannot be empty."))]
    #[serde(default, deserialize_with = "deserialize_due_date")]
    pub due_date: Option<DateTime<Utc>>,
}

const DUE_DATE_IN_PAST: &str = "Date cannot be earlier than creation date.";

impl CreateTaskRequest {
    /// Field rules plus the "not in the past" check on the due date, which
    /// compares calendar days in UTC so a task due today is accepted.
    pub fn check(&self, now: DateTime<Utc>) -> Result<(), HashMap<String, String>> {
        let mut errors = match self.validate() {
            Ok(()) => HashMap::new(),
            Err(e) => field_errors(&e),
        };

        if let Some(due) = self.due_date {
            if due.date_naive() < now.date_naive() {
                errors.insert("due_date".to_string(), DUE_DATE_IN_PAST.to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS` (read as UTC) and
/// bare `YYYY-MM-DD` dates (midnight UTC).
fn deserialize_due_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => parse_due_date(text)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid due_date: {}", text))),
    }
}

pub fn parse_due_date(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[derive(Debug, Error)]
pub enum TaskServiceError {
    #[error("Validation failed")]
    Validation(HashMap<String, String>),

    #[error("Task not found.")]
    NotFound,

    #[error("You are not allowed to update this task.")]
    Forbidden,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

pub struct TaskService {
    store: Arc<dyn TaskStore>,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, owner_id: i32, request: CreateTaskRequest) -> Result<Task, TaskServiceError> {
        request.check(Utc::now()).map_err(TaskServiceError::Validation)?;

        let due_date = request
            .due_date
            .ok_or_else(|| TaskServiceError::Validation(HashMap::from([(
                "due_date".to_string(),
                "Date cannot be empty.".to_string(),
            )])))?;

        let task = self
            .store
            .create(NewTask {
                title: request.title,
                description: request.description,
                user_id: owner_id,
                due_date,
            })
            .await?;

        info!("User {} created task {}", owner_id, task.id);
        Ok(task)
    }

    /// Owner's tasks split into completed and pending. A `due_date` filter that
    /// does not parse as `YYYY-MM-DD` is ignored and every task is returned.
    pub async fn list(&self, owner_id: i32, due_date: Option<&str>) -> Result<TaskBuckets, TaskServiceError> {
        let due_on = due_date.and_then(|raw| {
            let parsed = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok();
            if parsed.is_none() {
                warn!("Ignoring unparseable due_date filter: {}", raw);
            }
            parsed
        });

        let tasks = self.store.list_for_user(owner_id, due_on).await?;
        Ok(TaskBuckets::split(tasks))
    }

    pub async fn complete(&self, owner_id: i32, task_id: i32) -> Result<Task, TaskServiceError> {
        let task = self
            .store
            .find(task_id)
            .await?
            .ok_or(TaskServiceError::NotFound)?;

        if task.user_id != owner_id {
            warn!("User {} tried to complete task {} owned by {}", owner_id, task_id, task.user_id);
            return Err(TaskServiceError::Forbidden);
        }

        let task = self.store.mark_completed(task_id, Utc::now()).await?;
        info!("User {} completed task {}", owner_id, task_id);
        Ok(task)
    }
}
