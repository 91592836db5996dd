//! Task routes
//!
//! Every route sits behind the auth gate and only sees the caller's tasks.

use crate::auth::{require_auth, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::services::TaskService;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, patch},
    Json, Router,
};
use taskboard_shared::{
    CreateTaskRequest, MessageResponse, TaskResponse, UpdateTaskRequest,
};
use uuid::Uuid;

/// Create task routes
pub fn task_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/:id", patch(update_task).delete(delete_task))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

fn parse_task_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::BadRequest("Invalid task id".to_string()))
}

/// GET /api/tasks
async fn list_tasks(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Json<Vec<TaskResponse>>> {
    let tasks = TaskService::list(&state.db, auth_user.user_id).await?;
    Ok(Json(tasks))
}

/// POST /api/tasks
async fn create_task(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    let task = TaskService::create(&state.db, auth_user.user_id, req).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// PATCH /api/tasks/:id
async fn update_task(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let task_id = parse_task_id(&id)?;
    let task = TaskService::update(&state.db, auth_user.user_id, task_id, req).await?;
    Ok(Json(task))
}

/// DELETE /api/tasks/:id
async fn delete_task(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let task_id = parse_task_id(&id)?;
    TaskService::delete(&state.db, auth_user.user_id, task_id).await?;
    Ok(Json(MessageResponse::new("Task deleted")))
}
