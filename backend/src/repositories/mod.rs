//! Database repositories
//!
//! Provides data access layer for database operations.

pub mod task;
pub mod user;

pub use task::{CreateTask, TaskRecord, TaskRepository, UpdateTask};
pub use user::{NewUser, ProfileChanges, UserRecord, UserRepository};
