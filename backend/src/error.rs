//! Application error handling
//!
//! One error type for every handler. Each variant maps to a status code and
//! a `{message, code, errors?, error?}` body; internal details only leave the
//! process outside production.

use crate::config::AppConfig;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use taskboard_shared::validation::FieldError;
use thiserror::Error;
use tracing::error;

/// API error type that can be converted to HTTP responses
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    /// Username or email already belongs to another record
    #[error("{0}")]
    DuplicateIdentity(String),

    /// Same message for unknown email and wrong password
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("No authorization token provided. Please log in.")]
    MissingToken,

    /// Bad signature, malformed or expired
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Token is valid but its subject no longer exists
    #[error("User not found. Please log in again.")]
    UnknownSubject,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("Database error")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    /// Single field validation failure
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::DuplicateIdentity(_) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::InvalidCredentials
            | ApiError::MissingToken
            | ApiError::InvalidToken
            | ApiError::UnknownSubject => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) | ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::DuplicateIdentity(_) => "DUPLICATE_IDENTITY",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::MissingToken => "MISSING_TOKEN",
            ApiError::InvalidToken => "INVALID_TOKEN",
            ApiError::UnknownSubject => "UNKNOWN_SUBJECT",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<Vec<FieldError>> for ApiError {
    fn from(errors: Vec<FieldError>) -> Self {
        ApiError::Validation(errors)
    }
}

/// Body rejections keep the JSON error shape. A field of the wrong type is a
/// validation error on that field; anything else is a bad request.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => {
                ApiError::Validation(vec![data_error_field(&err.body_text())])
            }
            JsonRejection::JsonSyntaxError(_) => {
                ApiError::BadRequest("Request body is not valid JSON".to_string())
            }
            JsonRejection::MissingJsonContentType(_) => ApiError::BadRequest(
                "Expected request with `Content-Type: application/json`".to_string(),
            ),
            other => ApiError::BadRequest(other.body_text()),
        }
    }
}

const DATA_ERROR_PREFIX: &str = "Failed to deserialize the JSON body into the target type: ";

/// Split `"<path>: <reason>"` from a deserialization failure into a field error
fn data_error_field(text: &str) -> FieldError {
    let detail = text.strip_prefix(DATA_ERROR_PREFIX).unwrap_or(text);
    let (field, reason) = match detail.split_once(": ") {
        Some((path, reason))
            if !path.is_empty()
                && path
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']')) =>
        {
            (path, reason)
        }
        _ => ("body", detail),
    };
    let reason = reason.split(" at line ").next().unwrap_or(reason);
    FieldError::new(field, reason)
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
    /// Internal detail, development only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let detail = match &self {
            ApiError::Internal(err) => {
                error!("Internal error: {:?}", err);
                Some(format!("{:#}", err))
            }
            ApiError::Database(err) => {
                error!("Database error: {:?}", err);
                Some(err.to_string())
            }
            _ => None,
        };

        let body = ErrorResponse {
            message: self.to_string(),
            code,
            errors: match self {
                ApiError::Validation(errors) => errors,
                _ => Vec::new(),
            },
            error: detail.filter(|_| !AppConfig::is_production()),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
