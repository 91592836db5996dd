//! Domain models shared by the API and its clients

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Base URL of the generated placeholder avatars
pub const PLACEHOLDER_AVATAR_BASE: &str = "https://ui-avatars.com/api/";

/// Placeholder avatar keyed by display name
pub fn default_avatar_url(name: &str) -> String {
    format!(
        "{}?name={}&background=random",
        PLACEHOLDER_AVATAR_BASE,
        urlencoding::encode(name)
    )
}

/// Whether an avatar reference points at a generated placeholder
/// rather than an uploaded file
pub fn is_placeholder_avatar(reference: &str) -> bool {
    reference.is_empty() || reference.contains("ui-avatars.com")
}

/// Task priority
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 3] = [TaskPriority::Low, TaskPriority::Medium, TaskPriority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            _ => Err("Priority must be one of: low, medium, high".to_string()),
        }
    }
}

/// Task status
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "in-progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            _ => Err("Status must be one of: pending, in-progress, completed".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_avatar_encodes_name() {
        let url = default_avatar_url("Ada Lovelace");
        assert_eq!(
            url,
            "https://ui-avatars.com/api/?name=Ada%20Lovelace&background=random"
        );
        assert!(is_placeholder_avatar(&url));
        assert!(!is_placeholder_avatar("/uploads/profiles/abc-1.png"));
    }

    #[test]
    fn test_priority_parse_and_display() {
        for priority in TaskPriority::ALL {
            assert_eq!(priority.as_str().parse::<TaskPriority>().unwrap(), priority);
        }
        assert!("urgent".parse::<TaskPriority>().is_err());
        assert_eq!(TaskPriority::default(), TaskPriority::Medium);
    }

    #[test]
    fn test_status_serde_uses_kebab_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        assert_eq!("In-Progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!(TaskStatus::default(), TaskStatus::Pending);
    }
}
