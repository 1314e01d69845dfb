//! Error types module
//!
//! All errors surfaced to HTTP callers are unified under [`AppError`]. Each
//! variant knows its HTTP status, machine-readable code, and log level, so the
//! API layer can render a consistent response shape without per-handler
//! mapping.
//!
//! Worker-side errors never reach HTTP callers; they are absorbed into job and
//! asset state (see [`crate::transcode_error`]).

use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like session-state conflicts
    Warn,
    /// Error level - for unexpected failures
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Upload session exists but is not in a completable state (already
    /// completed, expired record, or handle mismatch).
    #[error("Session state error: {0}")]
    SessionState(String),

    #[error("Session expired: {0}")]
    SessionExpired(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

impl AppError {
    /// HTTP status code to return to the caller.
    pub fn http_status_code(&self) -> u16 {
        match self {
            AppError::Database(_) => 500,
            AppError::Storage(_) => 503,
            AppError::InvalidInput(_) => 400,
            AppError::NotFound(_) => 404,
            AppError::SessionState(_) => 409,
            AppError::SessionExpired(_) => 400,
            AppError::Unauthorized(_) => 401,
            AppError::Internal(_) | AppError::InternalWithSource { .. } => 500,
        }
    }

    /// Machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::SessionState(_) => "SESSION_STATE",
            AppError::SessionExpired(_) => "SESSION_EXPIRED",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller may retry the whole request.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::Storage(_))
    }

    /// Whether internal details should be hidden from clients in production.
    pub fn is_sensitive(&self) -> bool {
        matches!(
            self,
            AppError::Database(_)
                | AppError::Storage(_)
                | AppError::Internal(_)
                | AppError::InternalWithSource { .. }
        )
    }

    pub fn log_level(&self) -> LogLevel {
        match self {
            AppError::InvalidInput(_) | AppError::NotFound(_) | AppError::Unauthorized(_) => {
                LogLevel::Debug
            }
            AppError::SessionState(_) | AppError::SessionExpired(_) => LogLevel::Warn,
            AppError::Database(_)
            | AppError::Storage(_)
            | AppError::Internal(_)
            | AppError::InternalWithSource { .. } => LogLevel::Error,
        }
    }

    /// Client-facing message. Sensitive variants return a generic message;
    /// the detailed cause stays in the logs.
    pub fn client_message(&self) -> String {
        if self.is_sensitive() {
            match self {
                AppError::Storage(_) => "Storage backend unavailable".to_string(),
                _ => "An internal error occurred".to_string(),
            }
        } else {
            self.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(AppError::InvalidInput("x".into()).http_status_code(), 400);
        assert_eq!(AppError::NotFound("x".into()).http_status_code(), 404);
        assert_eq!(AppError::SessionState("x".into()).http_status_code(), 409);
        assert_eq!(AppError::SessionExpired("x".into()).http_status_code(), 400);
        assert_eq!(AppError::Storage("x".into()).http_status_code(), 503);
        assert_eq!(AppError::Internal("x".into()).http_status_code(), 500);
    }

    #[test]
    fn only_backend_errors_are_recoverable() {
        assert!(AppError::Storage("down".into()).is_recoverable());
        assert!(!AppError::InvalidInput("bad".into()).is_recoverable());
        assert!(!AppError::SessionExpired("late".into()).is_recoverable());
    }

    #[test]
    fn sensitive_errors_hide_details() {
        let err = AppError::Internal("secret connection string".into());
        assert!(err.is_sensitive());
        assert!(!err.client_message().contains("secret"));

        let err = AppError::InvalidInput("fileSizeBytes must be positive".into());
        assert!(!err.is_sensitive());
        assert!(err.client_message().contains("fileSizeBytes"));
    }

    #[test]
    fn validation_errors_convert_to_invalid_input() {
        use validator::Validate;

        #[derive(Validate)]
        struct Probe {
            #[validate(length(min = 1))]
            name: String,
        }

        let probe = Probe {
            name: String::new(),
        };
        let err: AppError = probe.validate().unwrap_err().into();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }
}
