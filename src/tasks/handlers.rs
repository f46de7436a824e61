use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{get, patch, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{DeletedResponse, TaskFields, TaskListResponse, TaskResponse},
    services,
};
use crate::{auth::jwt::AuthUser, error::AppError, state::AppState};

pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/:id", put(update_task).delete(delete_task))
        .route("/api/tasks/:id/toggle", patch(toggle_task))
}

#[instrument(skip(state))]
pub async fn list_tasks(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<TaskListResponse>, AppError> {
    let tasks = services::list_tasks(state.tasks.as_ref(), user_id).await?;
    Ok(Json(TaskListResponse { success: true, tasks }))
}

#[instrument(skip(state, payload))]
pub async fn create_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<TaskFields>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskResponse>), AppError> {
    let Json(fields) = payload?;
    let task = services::create_task(state.tasks.as_ref(), user_id, fields).await?;
    Ok((StatusCode::CREATED, Json(TaskResponse { success: true, task })))
}

#[instrument(skip(state, id, payload))]
pub async fn update_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<TaskFields>, JsonRejection>,
) -> Result<Json<TaskResponse>, AppError> {
    let Path(id) = id?;
    let Json(fields) = payload?;
    let task = services::update_task(state.tasks.as_ref(), user_id, id, fields).await?;
    Ok(Json(TaskResponse { success: true, task }))
}

#[instrument(skip(state, id))]
pub async fn delete_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<DeletedResponse>, AppError> {
    let Path(id) = id?;
    services::delete_task(state.tasks.as_ref(), user_id, id).await?;
    Ok(Json(DeletedResponse { success: true }))
}

#[instrument(skip(state, id))]
pub async fn toggle_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<TaskResponse>, AppError> {
    let Path(id) = id?;
    let task = services::toggle_complete(state.tasks.as_ref(), user_id, id).await?;
    Ok(Json(TaskResponse { success: true, task }))
}
