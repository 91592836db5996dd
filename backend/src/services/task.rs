//! Task service - owner-scoped task CRUD

use crate::error::ApiError;
use crate::repositories::{CreateTask, TaskRecord, TaskRepository, UpdateTask};
use sqlx::PgPool;
use std::str::FromStr;
use taskboard_shared::validation::{parse_deadline, validate_task_title};
use taskboard_shared::{
    CreateTaskRequest, FieldError, FieldErrors, TaskPriority, TaskResponse, TaskStatus,
    UpdateTaskRequest,
};
use uuid::Uuid;

const TASK_NOT_FOUND: &str = "Task not found";

/// Task service for task operations
pub struct TaskService;

impl TaskService {
    /// The owner's tasks, newest first
    pub async fn list(db: &PgPool, owner_id: Uuid) -> Result<Vec<TaskResponse>, ApiError> {
        let records = TaskRepository::list_for_owner(db, owner_id)
            .await
            .map_err(ApiError::Internal)?;
        records
            .into_iter()
            .map(|r| r.into_response().map_err(ApiError::Internal))
            .collect()
    }

    pub async fn create(
        db: &PgPool,
        owner_id: Uuid,
        request: CreateTaskRequest,
    ) -> Result<TaskResponse, ApiError> {
        let task = Self::validate_create(request)?;
        let record = TaskRepository::create(db, owner_id, task)
            .await
            .map_err(ApiError::Internal)?;
        Self::respond(record)
    }

    /// Partial update; a task owned by someone else is reported as missing
    pub async fn update(
        db: &PgPool,
        owner_id: Uuid,
        task_id: Uuid,
        request: UpdateTaskRequest,
    ) -> Result<TaskResponse, ApiError> {
        let update = Self::validate_update(request)?;
        let record = TaskRepository::update_for_owner(db, task_id, owner_id, update)
            .await
            .map_err(ApiError::Internal)?
            .ok_or_else(|| ApiError::NotFound(TASK_NOT_FOUND.to_string()))?;
        Self::respond(record)
    }

    pub async fn delete(db: &PgPool, owner_id: Uuid, task_id: Uuid) -> Result<(), ApiError> {
        let deleted = TaskRepository::delete_for_owner(db, task_id, owner_id)
            .await
            .map_err(ApiError::Internal)?;
        if !deleted {
            return Err(ApiError::NotFound(TASK_NOT_FOUND.to_string()));
        }
        Ok(())
    }

    fn validate_create(request: CreateTaskRequest) -> Result<CreateTask, ApiError> {
        let mut errors = FieldErrors::new();
        let title = request.title.trim().to_string();
        errors.check("title", validate_task_title(&title));

        let deadline = request
            .deadline
            .filter(|d| !d.trim().is_empty())
            .and_then(|d| record_err(&mut errors, "deadline", parse_deadline(&d)));
        let priority = request
            .priority
            .and_then(|p| record_err(&mut errors, "priority", TaskPriority::from_str(&p)));
        let status = request
            .status
            .and_then(|s| record_err(&mut errors, "status", TaskStatus::from_str(&s)));
        errors.into_result()?;

        Ok(CreateTask {
            title,
            description: request.description.unwrap_or_default(),
            deadline,
            priority: priority.unwrap_or_default(),
            status: status.unwrap_or_default(),
        })
    }

    fn validate_update(request: UpdateTaskRequest) -> Result<UpdateTask, ApiError> {
        let mut errors = FieldErrors::new();

        let title = request.title.map(|t| t.trim().to_string());
        if let Some(title) = &title {
            errors.check("title", validate_task_title(title));
        }

        let deadline = match request.deadline {
            None => None,
            Some(None) => Some(None),
            Some(Some(raw)) if raw.trim().is_empty() => Some(None),
            Some(Some(raw)) => {
                record_err(&mut errors, "deadline", parse_deadline(&raw)).map(Some)
            }
        };
        let priority = request
            .priority
            .and_then(|p| record_err(&mut errors, "priority", TaskPriority::from_str(&p)));
        let status = request
            .status
            .and_then(|s| record_err(&mut errors, "status", TaskStatus::from_str(&s)));
        errors.into_result()?;

        Ok(UpdateTask {
            title,
            description: request.description,
            deadline,
            priority,
            status,
        })
    }

    fn respond(record: TaskRecord) -> Result<TaskResponse, ApiError> {
        record.into_response().map_err(ApiError::Internal)
    }
}

fn record_err<T>(errors: &mut FieldErrors, field: &str, result: Result<T, String>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(message) => {
            errors.push(FieldError::new(field, message));
            None
        }
    }
}
