//! API request and response types

use crate::location::Location;
use crate::models::{TaskPriority, TaskStatus};
use crate::validation::{
    validate_email, validate_name, validate_password, validate_username, FieldError, FieldErrors,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Registration request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub password: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
}

impl RegisterRequest {
    /// Trim identity fields and normalize the email
    pub fn normalized(self) -> Self {
        Self {
            username: self.username.trim().to_string(),
            email: crate::validation::normalize_email(&self.email),
            password: self.password,
            name: self.name.trim().to_string(),
        }
    }

    /// Check every field, reporting all violations together
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = FieldErrors::new();
        errors.check("username", validate_username(&self.username));
        errors.check("email", validate_email(&self.email));
        errors.check("password", validate_password(&self.password));
        errors.check("name", validate_name(&self.name));
        errors.into_result()
    }
}

/// Login request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub password: String,
}

/// Public projection of a credential record. Never carries the secret.
///
/// Every field defaults to empty so client snapshots persisted by older
/// versions still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "profileImage", default)]
    pub profile_image: String,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub bio: String,
}

/// Response to registration and login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

/// Response to `GET /auth/verify`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub user: PublicUser,
}

/// Plain message body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Task as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub owner: String,
    pub title: String,
    pub description: String,
    pub deadline: Option<DateTime<Utc>>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create task request. Enum fields arrive as text and are validated by the
/// service so bad values are reported as field errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Partial task update. Unknown fields are ignored; an explicit
/// `"deadline": null` clears the deadline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub deadline: Option<Option<String>>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// A JSON `null` reads as an empty string so required-field checks report it
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Distinguishes a missing field (`None`) from an explicit null (`Some(None)`)
fn present_or_null<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
