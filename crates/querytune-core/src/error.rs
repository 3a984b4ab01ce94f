//! Error types and exit codes for querytune
//!
//! Exit codes:
//! - 0: Success
//! - 1: Generic failure
//! - 2: Usage error (bad flags/args, invalid configuration)
//! - 3: Data/input error (missing or unreadable profile, bad metrics file)

mod macros;

use std::path::PathBuf;

use thiserror::Error;

use crate::llm::GenerationError;

/// Exit codes for the querytune binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success (0)
    Success = 0,
    /// Generic failure (1)
    Failure = 1,
    /// Usage error - bad flags/args (2)
    Usage = 2,
    /// Data/input error - unreadable profile or metrics (3)
    Data = 3,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

/// Errors that can occur during querytune operations
#[derive(Error, Debug)]
pub enum QueryTuneError {
    // Usage errors (exit code 2)
    #[error("unknown format: {0} (expected: human or json)")]
    UnknownFormat(String),

    #[error("{0}")]
    UsageError(String),

    #[error("invalid {context}: {value}")]
    InvalidValue { context: String, value: String },

    #[error("unsupported {context}: {value} (supported: {supported})")]
    Unsupported {
        context: String,
        value: String,
        supported: String,
    },

    // Data/input errors (exit code 3)
    #[error("{context} not found: {value}")]
    NotFound { context: String, value: String },

    #[error("invalid profile {path:?}: {reason}")]
    InvalidProfile { path: PathBuf, reason: String },

    #[error("invalid metrics file {path:?}: {reason}")]
    InvalidMetrics { path: PathBuf, reason: String },

    // Generic failures (exit code 1)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("text generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("failed to {operation} {target}: {reason}")]
    FailedOperationWithTarget {
        operation: String,
        target: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl QueryTuneError {
    /// Create an error for a failed IO operation with context
    pub fn io_operation(
        operation: &str,
        path: impl std::fmt::Display,
        error: impl std::fmt::Display,
    ) -> Self {
        QueryTuneError::FailedOperationWithTarget {
            operation: operation.to_string(),
            target: path.to_string(),
            reason: error.to_string(),
        }
    }

    /// Create an error for an invalid value or configuration
    pub fn invalid_value(context: &str, value: impl std::fmt::Display) -> Self {
        QueryTuneError::InvalidValue {
            context: context.to_string(),
            value: value.to_string(),
        }
    }

    /// Create an error for an entity that was not found
    pub fn not_found(context: &str, value: impl std::fmt::Display) -> Self {
        QueryTuneError::NotFound {
            context: context.to_string(),
            value: value.to_string(),
        }
    }

    /// Create an error for an unsupported value
    pub fn unsupported(
        context: &str,
        value: impl std::fmt::Display,
        supported: impl std::fmt::Display,
    ) -> Self {
        QueryTuneError::Unsupported {
            context: context.to_string(),
            value: value.to_string(),
            supported: supported.to_string(),
        }
    }

    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            QueryTuneError::UnknownFormat(_)
            | QueryTuneError::UsageError(_)
            | QueryTuneError::InvalidValue { .. }
            | QueryTuneError::Unsupported { .. } => ExitCode::Usage,

            QueryTuneError::NotFound { .. }
            | QueryTuneError::InvalidProfile { .. }
            | QueryTuneError::InvalidMetrics { .. } => ExitCode::Data,

            QueryTuneError::Io(_)
            | QueryTuneError::Json(_)
            | QueryTuneError::Toml(_)
            | QueryTuneError::Generation(_)
            | QueryTuneError::FailedOperationWithTarget { .. }
            | QueryTuneError::Other(_) => ExitCode::Failure,
        }
    }

    /// Get the error type identifier
    pub fn error_type(&self) -> &'static str {
        match self {
            QueryTuneError::UnknownFormat(_) => "unknown_format",
            QueryTuneError::UsageError(_) => "usage_error",
            QueryTuneError::InvalidValue { .. } => "invalid_value",
            QueryTuneError::Unsupported { .. } => "unsupported",
            QueryTuneError::NotFound { .. } => "not_found",
            QueryTuneError::InvalidProfile { .. } => "invalid_profile",
            QueryTuneError::InvalidMetrics { .. } => "invalid_metrics",
            QueryTuneError::Io(_) => "io_error",
            QueryTuneError::Json(_) => "json_error",
            QueryTuneError::Toml(_) => "toml_error",
            QueryTuneError::Generation(_) => "generation_error",
            QueryTuneError::FailedOperationWithTarget { .. } => "failed_operation_with_target",
            QueryTuneError::Other(_) => "other",
        }
    }

    /// Convert error to JSON representation for structured error output.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.exit_code() as i32,
                "type": self.error_type(),
                "message": self.to_string(),
            }
        })
    }
}

/// Result type alias for querytune operations
pub type Result<T> = std::result::Result<T, QueryTuneError>;
