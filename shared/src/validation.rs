//! Input validation functions
//!
//! Field rules for credential records and tasks. Every check returns a
//! plain message; callers attach the field name through [`FieldError`] so
//! the API can report all problems of a request at once.

use chrono::{DateTime, NaiveDate, Utc};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use validator::ValidateEmail;

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 20;
pub const NAME_MIN_LEN: usize = 2;
pub const NAME_MAX_LEN: usize = 50;
pub const PASSWORD_MIN_LEN: usize = 6;
pub const PASSWORD_MAX_LEN: usize = 128;
pub const BIO_MAX_LEN: usize = 500;
pub const LOCATION_PART_MAX_LEN: usize = 50;
pub const TASK_TITLE_MAX_LEN: usize = 200;

fn username_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("username pattern is valid"))
}

/// Validation error tied to a request field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Collects field errors while a request is being checked
#[derive(Debug, Default)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of a single field check
    pub fn check(&mut self, field: &str, result: Result<(), String>) {
        if let Err(message) = result {
            self.0.push(FieldError::new(field, message));
        }
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(())` when nothing was recorded, otherwise every recorded error
    pub fn into_result(self) -> Result<(), Vec<FieldError>> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self.0)
        }
    }
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

/// Validate username: 3-20 characters, letters, digits and underscores
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }
    let len = char_len(username);
    if len < USERNAME_MIN_LEN {
        return Err(format!(
            "Username must be at least {} characters long",
            USERNAME_MIN_LEN
        ));
    }
    if len > USERNAME_MAX_LEN {
        return Err(format!("Username cannot exceed {} characters", USERNAME_MAX_LEN));
    }
    if !username_regex().is_match(username) {
        return Err("Username can only contain letters, numbers, and underscores".to_string());
    }
    Ok(())
}

/// Validate email format
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if email.len() > 255 {
        return Err("Email too long".to_string());
    }
    if !email.validate_email() {
        return Err("Please include a valid email".to_string());
    }
    Ok(())
}

/// Validate password policy (checked on the plaintext, before hashing)
pub fn validate_password(password: &str) -> Result<(), String> {
    if char_len(password) < PASSWORD_MIN_LEN {
        return Err(format!(
            "Password must be {} or more characters",
            PASSWORD_MIN_LEN
        ));
    }
    if char_len(password) > PASSWORD_MAX_LEN {
        return Err("Password too long".to_string());
    }
    Ok(())
}

/// Validate display name: 2-50 characters
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Name is required".to_string());
    }
    let len = char_len(name);
    if len < NAME_MIN_LEN {
        return Err(format!("Name must be at least {} characters long", NAME_MIN_LEN));
    }
    if len > NAME_MAX_LEN {
        return Err(format!("Name cannot exceed {} characters", NAME_MAX_LEN));
    }
    Ok(())
}

pub fn validate_bio(bio: &str) -> Result<(), String> {
    if char_len(bio) > BIO_MAX_LEN {
        return Err(format!("Bio cannot exceed {} characters", BIO_MAX_LEN));
    }
    Ok(())
}

/// Validate a city or country name
pub fn validate_location_part(label: &str, value: &str) -> Result<(), String> {
    if char_len(value) > LOCATION_PART_MAX_LEN {
        return Err(format!(
            "{} name cannot exceed {} characters",
            label, LOCATION_PART_MAX_LEN
        ));
    }
    Ok(())
}

pub fn validate_task_title(title: &str) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("Title is required".to_string());
    }
    if char_len(title) > TASK_TITLE_MAX_LEN {
        return Err(format!("Title cannot exceed {} characters", TASK_TITLE_MAX_LEN));
    }
    Ok(())
}

/// Normalize an email address for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Parse a task deadline.
///
/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates (date inputs in
/// forms), the latter interpreted as midnight UTC.
pub fn parse_deadline(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| "Deadline must be a date (YYYY-MM-DD) or an RFC 3339 timestamp".to_string())
}
