//! Application error types for the callbot admin console
//!
//! Provides a unified error model across all screens with:
//! - Stable error codes for frontend handling
//! - User-friendly messages
//! - Optional internal details for logging
//! - Retry hints for UI

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error categories for grouping and UI display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Input validation errors (bad formats, empty required fields)
    Validation,
    /// Authentication / session errors
    Auth,
    /// Network errors (connection, timeout)
    Network,
    /// Backend API rejections (non-2xx with a message)
    Api,
    /// Response shape mismatches at the decode boundary
    Decode,
    /// Event-stream errors
    Stream,
    /// Resource not found
    NotFound,
    /// Internal errors (unexpected state, bugs)
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Auth => write!(f, "auth"),
            Self::Network => write!(f, "network"),
            Self::Api => write!(f, "api"),
            Self::Decode => write!(f, "decode"),
            Self::Stream => write!(f, "stream"),
            Self::NotFound => write!(f, "not_found"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Stable error codes for frontend handling
/// Format: CATEGORY_SPECIFIC_ERROR
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCode(pub String);

impl ErrorCode {
    // Validation errors
    pub const VALIDATION_EMPTY_INPUT: &'static str = "VALIDATION_EMPTY_INPUT";
    pub const VALIDATION_INVALID_FORMAT: &'static str = "VALIDATION_INVALID_FORMAT";
    pub const VALIDATION_INPUT_TOO_LARGE: &'static str = "VALIDATION_INPUT_TOO_LARGE";
    pub const VALIDATION_PASSWORD_MISMATCH: &'static str = "VALIDATION_PASSWORD_MISMATCH";

    // Auth errors
    pub const AUTH_UNAUTHORIZED: &'static str = "AUTH_UNAUTHORIZED";
    pub const AUTH_APPROVAL_PENDING: &'static str = "AUTH_APPROVAL_PENDING";
    pub const AUTH_ROOT_REQUIRED: &'static str = "AUTH_ROOT_REQUIRED";
    pub const AUTH_NO_SESSION: &'static str = "AUTH_NO_SESSION";

    // Network errors
    pub const NETWORK_CONNECTION_FAILED: &'static str = "NETWORK_CONNECTION_FAILED";
    pub const NETWORK_TIMEOUT: &'static str = "NETWORK_TIMEOUT";

    // Backend API errors
    pub const API_REJECTED: &'static str = "API_REJECTED";
    pub const API_BAD_SHAPE: &'static str = "API_BAD_SHAPE";

    // Stream errors
    pub const STREAM_DISCONNECTED: &'static str = "STREAM_DISCONNECTED";

    // Not found errors
    pub const NOT_FOUND_RECORD: &'static str = "NOT_FOUND_RECORD";

    // Internal errors
    pub const INTERNAL_ERROR: &'static str = "INTERNAL_ERROR";

    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Application error type for all screens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppError {
    /// Stable error code for frontend handling
    pub code: String,
    /// User-friendly error message
    pub message: String,
    /// Optional internal details for logging (not shown to user)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Whether the operation can be retried
    pub retryable: bool,
    /// Error category for grouping
    pub category: ErrorCategory,
}

impl AppError {
    /// Create a new application error
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        category: ErrorCategory,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            detail: None,
            retryable: false,
            category,
        }
    }

    /// Add internal detail for logging
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Mark as retryable
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }

    /// Whether the caller should route to the login screen
    pub fn requires_login(&self) -> bool {
        self.code == ErrorCode::AUTH_UNAUTHORIZED || self.code == ErrorCode::AUTH_NO_SESSION
    }

    // =========================================================================
    // Convenience constructors for common errors
    // =========================================================================

    /// Auth error: backend rejected the session token
    pub fn unauthorized() -> Self {
        Self::new(
            ErrorCode::AUTH_UNAUTHORIZED,
            "Session expired or invalid. Please sign in again",
            ErrorCategory::Auth,
        )
    }

    /// Auth error: no session established
    pub fn no_session() -> Self {
        Self::new(
            ErrorCode::AUTH_NO_SESSION,
            "Not signed in",
            ErrorCategory::Auth,
        )
    }

    /// Auth error: the account is still awaiting approval
    pub fn approval_pending() -> Self {
        Self::new(
            ErrorCode::AUTH_APPROVAL_PENDING,
            "Your account is awaiting administrator approval",
            ErrorCategory::Auth,
        )
    }

    /// Auth error: the action requires the root administrator
    pub fn root_required() -> Self {
        Self::new(
            ErrorCode::AUTH_ROOT_REQUIRED,
            "Only the root administrator can perform this action",
            ErrorCategory::Auth,
        )
    }

    /// Network error: request timed out
    pub fn timeout() -> Self {
        Self::new(
            ErrorCode::NETWORK_TIMEOUT,
            "The request timed out",
            ErrorCategory::Network,
        )
        .retryable()
    }

    /// Network error: connection failed
    pub fn connection_failed(detail: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::NETWORK_CONNECTION_FAILED,
            "Connection failed",
            ErrorCategory::Network,
        )
        .with_detail(detail)
        .retryable()
    }

    /// Backend rejection with the message extracted from the response body
    pub fn api_rejected(status: u16, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::API_REJECTED,
            message,
            ErrorCategory::Api,
        )
        .with_detail(format!("HTTP {}", status))
    }

    /// Decode boundary failure
    pub fn bad_shape(detail: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::API_BAD_SHAPE,
            "The server returned an unexpected response",
            ErrorCategory::Decode,
        )
        .with_detail(detail)
    }

    /// Not found error
    pub fn record_not_found(id: &str) -> Self {
        Self::new(
            ErrorCode::NOT_FOUND_RECORD,
            format!("Record not found: {}", id),
            ErrorCategory::NotFound,
        )
    }

    /// Internal error
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::INTERNAL_ERROR,
            "An internal error occurred",
            ErrorCategory::Internal,
        )
        .with_detail(detail)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}

impl From<crate::api::ApiError> for AppError {
    fn from(e: crate::api::ApiError) -> Self {
        use crate::api::ApiError;
        match e {
            ApiError::Timeout => Self::timeout(),
            ApiError::Unauthorized => Self::unauthorized(),
            ApiError::Request(e) => Self::connection_failed(e.to_string()),
            ApiError::Api { status, message, .. } => {
                if status == 404 {
                    Self::new(ErrorCode::NOT_FOUND_RECORD, message, ErrorCategory::NotFound)
                } else {
                    Self::api_rejected(status, message)
                }
            }
            ApiError::Decode(detail) => Self::bad_shape(detail),
        }
    }
}

impl From<crate::validation::ValidationError> for AppError {
    fn from(e: crate::validation::ValidationError) -> Self {
        use crate::validation::ValidationError;
        match e {
            ValidationError::EmptyInput(field) => Self::new(
                ErrorCode::VALIDATION_EMPTY_INPUT,
                format!("{} cannot be empty", field),
                ErrorCategory::Validation,
            ),
            ValidationError::InputTooLarge { field, size, max } => Self::new(
                ErrorCode::VALIDATION_INPUT_TOO_LARGE,
                format!("{} too large: {} bytes (max: {} bytes)", field, size, max),
                ErrorCategory::Validation,
            ),
            ValidationError::InvalidFormat(msg) => Self::new(
                ErrorCode::VALIDATION_INVALID_FORMAT,
                msg,
                ErrorCategory::Validation,
            ),
            ValidationError::PasswordMismatch => Self::new(
                ErrorCode::VALIDATION_PASSWORD_MISMATCH,
                "Passwords do not match",
                ErrorCategory::Validation,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let err = AppError::unauthorized();
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("AUTH_UNAUTHORIZED"));
        assert!(json.contains("auth"));
    }

    #[test]
    fn test_error_with_detail() {
        let err = AppError::connection_failed("connection refused");
        assert!(err.retryable);
        assert_eq!(err.detail.unwrap(), "connection refused");
    }

    #[test]
    fn test_requires_login() {
        assert!(AppError::unauthorized().requires_login());
        assert!(AppError::no_session().requires_login());
        assert!(!AppError::timeout().requires_login());
    }

    #[test]
    fn test_error_display() {
        let err = AppError::approval_pending();
        let display = err.to_string();
        assert!(display.contains("AUTH_APPROVAL_PENDING"));
        assert!(display.contains("approval"));
    }
}
