//! Task repository
//!
//! Every query is scoped by owner id; a task that belongs to someone else is
//! indistinguishable from one that does not exist.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use taskboard_shared::{TaskPriority, TaskResponse, TaskStatus};
use uuid::Uuid;

/// Task record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub deadline: Option<DateTime<Utc>>,
    pub priority: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    pub fn into_response(self) -> Result<TaskResponse> {
        let priority: TaskPriority = self
            .priority
            .parse()
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("task {} has unknown priority", self.id))?;
        let status: TaskStatus = self
            .status
            .parse()
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("task {} has unknown status", self.id))?;

        Ok(TaskResponse {
            id: self.id.to_string(),
            owner: self.owner_id.to_string(),
            title: self.title,
            description: self.description,
            deadline: self.deadline,
            priority,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub title: String,
    pub description: String,
    pub deadline: Option<DateTime<Utc>>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
}

/// Partial task update; `deadline: Some(None)` clears it
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<Option<DateTime<Utc>>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
}

/// Task repository
pub struct TaskRepository;

impl TaskRepository {
    pub async fn list_for_owner(pool: &PgPool, owner_id: Uuid) -> Result<Vec<TaskRecord>> {
        let tasks = sqlx::query_as::<_, TaskRecord>(
            r#"
            SELECT id, owner_id, title, description, deadline, priority, status,
                   created_at, updated_at
            FROM tasks
            WHERE owner_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    pub async fn create(pool: &PgPool, owner_id: Uuid, task: CreateTask) -> Result<TaskRecord> {
        let record = sqlx::query_as::<_, TaskRecord>(
            r#"
            INSERT INTO tasks (owner_id, title, description, deadline, priority, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, owner_id, title, description, deadline, priority, status,
                      created_at, updated_at
            "#,
        )
        .bind(owner_id)
        .bind(task.title)
        .bind(task.description)
        .bind(task.deadline)
        .bind(task.priority.as_str())
        .bind(task.status.as_str())
        .fetch_one(pool)
        .await?;

        Ok(record)
    }

    pub async fn update_for_owner(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        update: UpdateTask,
    ) -> Result<Option<TaskRecord>> {
        let (set_deadline, deadline) = match update.deadline {
            Some(value) => (true, value),
            None => (false, None),
        };

        let record = sqlx::query_as::<_, TaskRecord>(
            r#"
            UPDATE tasks SET
                title = COALESCE($3, title),
                description = COALESCE($4, description),
                deadline = CASE WHEN $5 THEN $6 ELSE deadline END,
                priority = COALESCE($7, priority),
                status = COALESCE($8, status),
                updated_at = NOW()
            WHERE id = $1 AND owner_id = $2
            RETURNING id, owner_id, title, description, deadline, priority, status,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(update.title)
        .bind(update.description)
        .bind(set_deadline)
        .bind(deadline)
        .bind(update.priority.map(|p| p.as_str()))
        .bind(update.status.map(|s| s.as_str()))
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }

    /// Delete a task, returning whether the owner had it
    pub async fn delete_for_owner(pool: &PgPool, id: Uuid, owner_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(priority: &str, status: &str) -> TaskRecord {
        TaskRecord {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: "Write report".into(),
            description: String::new(),
            deadline: None,
            priority: priority.into(),
            status: status.into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_record_into_response() {
        let record = record("high", "in-progress");
        let owner = record.owner_id.to_string();
        let response = record.into_response().unwrap();

        assert_eq!(response.owner, owner);
        assert_eq!(response.priority, TaskPriority::High);
        assert_eq!(response.status, TaskStatus::InProgress);
    }

    #[test]
    fn test_unknown_enum_value_is_an_error() {
        assert!(record("urgent", "pending").into_response().is_err());
        assert!(record("low", "archived").into_response().is_err());
    }
}
