//! Structured error types for the dashboard layer.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    InvalidArgument,

    // Not found errors
    TaskNotFound,

    // Store errors
    QueryFailed,
    WriteFailed,

    // Environment errors
    ConfigMissing,
}

/// Errors surfaced by the query, aggregation and write paths.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// A read against the task store failed.
    #[error("query failed: {reason}")]
    QueryFailed { reason: String },

    /// An insert/update against the task store failed.
    #[error("write failed: {reason}")]
    WriteFailed { reason: String },

    /// A required configuration value or file is absent.
    #[error("configuration missing: {name}")]
    ConfigMissing { name: String },

    #[error("invalid value for {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    #[error("task not found: {id}")]
    TaskNotFound { id: String },
}

impl DashboardError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DashboardError::QueryFailed { .. } => ErrorCode::QueryFailed,
            DashboardError::WriteFailed { .. } => ErrorCode::WriteFailed,
            DashboardError::ConfigMissing { .. } => ErrorCode::ConfigMissing,
            DashboardError::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            DashboardError::TaskNotFound { .. } => ErrorCode::TaskNotFound,
        }
    }

    // Convenience constructors

    pub fn query(err: impl fmt::Display) -> Self {
        Self::QueryFailed {
            reason: err.to_string(),
        }
    }

    pub fn write(err: impl fmt::Display) -> Self {
        Self::WriteFailed {
            reason: err.to_string(),
        }
    }

    pub fn config_missing(name: impl Into<String>) -> Self {
        Self::ConfigMissing { name: name.into() }
    }

    pub fn invalid_value(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn task_not_found(id: impl fmt::Display) -> Self {
        Self::TaskNotFound { id: id.to_string() }
    }

    /// JSON body for HTTP error responses.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            success: false,
            code: self.code(),
            message: self.to_string(),
        }
    }
}

/// Serialized error payload: `{success: false, code, message}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub code: ErrorCode,
    pub message: String,
}

/// Result type for dashboard operations.
pub type DashboardResult<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_variants() {
        assert_eq!(DashboardError::query("boom").code(), ErrorCode::QueryFailed);
        assert_eq!(DashboardError::write("dup").code(), ErrorCode::WriteFailed);
        assert_eq!(
            DashboardError::config_missing("TASKBOARD_DB_PATH").code(),
            ErrorCode::ConfigMissing
        );
    }

    #[test]
    fn body_serializes_screaming_code() {
        let body = DashboardError::query("connection reset").to_body();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "QUERY_FAILED");
        assert_eq!(json["message"], "query failed: connection reset");
    }
}
