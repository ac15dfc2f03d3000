//! Structured error types shared by the store, the tools and the router.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Payload problems, never reach storage
    ValidationError,

    // Lookup errors
    NotFound,
    AmbiguousId,
    UnknownTool,

    // Storage errors
    LockTimeout,
    StorageError,

    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::AmbiguousId => "AMBIGUOUS_ID",
            ErrorCode::UnknownTool => "UNKNOWN_TOOL",
            ErrorCode::LockTimeout => "LOCK_TIMEOUT",
            ErrorCode::StorageError => "STORAGE_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether the failure came from the storage layer rather than the request.
    pub fn is_storage(&self) -> bool {
        matches!(self, ErrorCode::LockTimeout | ErrorCode::StorageError)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error for store and tool failures.
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct TaskError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl TaskError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn missing_field(field: &str) -> Self {
        Self::new(ErrorCode::ValidationError, format!("{} is required", field)).with_field(field)
    }

    pub fn invalid_value(field: &str, reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, reason).with_field(field)
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, reason)
    }

    pub fn task_not_found(task_id: &str) -> Self {
        Self::new(ErrorCode::NotFound, format!("Task not found: {}", task_id))
    }

    pub fn ambiguous_id(prefix: &str, candidates: &[String]) -> Self {
        Self::new(
            ErrorCode::AmbiguousId,
            format!(
                "Task id prefix '{}' matches {} tasks",
                prefix,
                candidates.len()
            ),
        )
        .with_details(candidates.join(", "))
    }

    pub fn unknown_tool(name: &str) -> Self {
        Self::new(ErrorCode::UnknownTool, format!("Unknown tool: {}", name))
    }

    pub fn lock_timeout(path: impl fmt::Display, waited_ms: u128) -> Self {
        Self::new(
            ErrorCode::LockTimeout,
            format!("Timed out after {}ms waiting for lock on {}", waited_ms, path),
        )
    }

    pub fn storage(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::StorageError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl From<std::io::Error> for TaskError {
    fn from(err: std::io::Error) -> Self {
        TaskError::storage(err)
    }
}

impl From<serde_json::Error> for TaskError {
    fn from(err: serde_json::Error) -> Self {
        TaskError::storage(format!("task file is not valid JSON: {}", err))
    }
}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for TaskError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<TaskError>() {
            Ok(task_err) => task_err,
            Err(err) => TaskError::internal(err),
        }
    }
}

/// Result type for store and tool operations.
pub type TaskResult<T> = std::result::Result<T, TaskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_serializes_screaming_snake_case() {
        let json = serde_json::to_value(ErrorCode::AmbiguousId).unwrap();
        assert_eq!(json, "AMBIGUOUS_ID");
        assert_eq!(ErrorCode::LockTimeout.as_str(), "LOCK_TIMEOUT");
    }

    #[test]
    fn error_omits_empty_optional_fields() {
        let json = serde_json::to_value(TaskError::task_not_found("abcd")).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert!(json.get("field").is_none());
        assert!(json.get("details").is_none());
    }

    #[test]
    fn anyhow_roundtrip_preserves_code() {
        let original = TaskError::missing_field("title");
        let wrapped: anyhow::Error = original.into();
        let back: TaskError = wrapped.into();
        assert_eq!(back.code, ErrorCode::ValidationError);
        assert_eq!(back.field.as_deref(), Some("title"));
    }

    #[test]
    fn storage_codes_are_flagged() {
        assert!(ErrorCode::LockTimeout.is_storage());
        assert!(ErrorCode::StorageError.is_storage());
        assert!(!ErrorCode::NotFound.is_storage());
    }
}
