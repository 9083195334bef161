// handlers/protected/tasks.rs - Task endpoints, always scoped to the caller

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Extension, Json,
};
use serde::Deserialize;

use crate::database::models::{Task, TaskBuckets};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::task_service::CreateTaskRequest;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    pub due_date: Option<String>,
}

/// POST /api/tasks - Create a task owned by the caller
///
/// Expected Input:
/// ```json
/// {
///   "title": "Write report",
///   "description": "Quarterly numbers",
///   "due_date": "2030-05-01"
/// }
/// ```
pub async fn create_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> ApiResult<Task> {
    let owner = user.user_id()?;
    let Json(request) = payload.map_err(ApiError::from)?;
    let task = state.tasks.create(owner, request).await?;
    Ok(ApiResponse::created(task))
}

/// GET /api/tasks?due_date=YYYY-MM-DD - Caller's tasks as
/// `{completed_tasks, pending_tasks}`
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    query: Result<Query<TaskListQuery>, QueryRejection>,
) -> ApiResult<TaskBuckets> {
    let owner = user.user_id()?;
    let Query(query) = query.map_err(ApiError::from)?;
    let buckets = state.tasks.list(owner, query.due_date.as_deref()).await?;
    Ok(ApiResponse::success(buckets))
}

/// PATCH /api/tasks/:id/complete - 404 when absent, 403 when owned by
/// someone else
pub async fn complete_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    task_id: Result<Path<i32>, PathRejection>,
) -> ApiResult<Task> {
    let owner = user.user_id()?;
    let Path(task_id) = task_id.map_err(ApiError::from)?;
    let task = state.tasks.complete(owner, task_id).await?;
    Ok(ApiResponse::success(task))
}
