//! Task routes
//!
//! Every operation here is scoped to the authenticated user: the access guard
//! resolves the identity and the repository filters by owner, so a task owned
//! by someone else looks exactly like a task that does not exist.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
};
use std::str::FromStr;
use tracing::debug;

use taskboard_db::{NewTask, TaskStatus, UpdateTask};

use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::state::AppState;

use super::types::{CreateTaskRequest, TaskResponse, TasksQuery, UpdateTaskRequest};

/// Maximum allowed task title length
const MAX_TITLE_LENGTH: usize = 200;

/// Validate task title
fn validate_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::BadRequest("Title cannot be empty".to_string()));
    }
    if title.len() > MAX_TITLE_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Title exceeds maximum length of {} characters",
            MAX_TITLE_LENGTH
        )));
    }
    Ok(())
}

/// POST /tasks
async fn create_task(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), ApiError> {
    validate_title(&request.title)?;

    debug!("Creating task for user {}", user.id);

    let task = state
        .db
        .insert_task(NewTask {
            title: request.title,
            description: request.description,
            owner_id: user.id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(task.into())))
}

/// GET /tasks
async fn list_tasks(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<TasksQuery>,
) -> Result<Json<Vec<TaskResponse>>, ApiError> {
    let limit = query.limit.clamp(1, 1000);
    let offset = query.offset.max(0);

    let tasks = state
        .db
        .list_tasks(user.id, query.search.as_deref(), offset, limit)
        .await?;

    Ok(Json(tasks.into_iter().map(TaskResponse::from).collect()))
}

/// GET /tasks/{id}
async fn get_task(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TaskResponse>, ApiError> {
    let task = state
        .db
        .get_task(id, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(task.into()))
}

/// PUT /tasks/{id}
async fn update_task(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateTaskRequest>,
) -> Result<Json<TaskResponse>, ApiError> {
    if let Some(title) = &request.title {
        validate_title(title)?;
    }

    let status = request
        .status
        .as_deref()
        .map(TaskStatus::from_str)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let update = UpdateTask {
        title: request.title,
        description: request.description.map(Some),
        status,
    };

    let task = state
        .db
        .update_task(id, user.id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(task.into()))
}

/// DELETE /tasks/{id}
async fn delete_task(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let deleted = state.db.delete_task(id, user.id).await?;

    if deleted {
        debug!("Deleted task {} for user {}", id, user.id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Task not found".to_string()))
    }
}

/// Create task routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", post(create_task))
        .route("/tasks", get(list_tasks))
        .route("/tasks/{id}", get(get_task))
        .route("/tasks/{id}", put(update_task))
        .route("/tasks/{id}", delete(delete_task))
}
