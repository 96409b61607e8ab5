//! Structured error output for scripted callers.
//!
//! Provides machine-parseable error information with:
//! - Error codes for categorization
//! - Hints for self-correction
//! - Retryability flags
//! - Context for debugging

use crate::error::AriaError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Machine-readable error codes.
///
/// These codes are stable and can be used for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // === Database Errors (exit code 2) ===
    DatabaseNotFound,
    DatabaseError,
    NotInitialized,
    AlreadyInitialized,

    // === Record Errors (exit code 3) ===
    NotFound,
    PreconditionViolated,

    // === Validation Errors (exit code 4) ===
    ValidationFailed,
    InvalidStatus,

    // === Conflict Engine Errors (exit code 5) ===
    StaleReference,
    MisalignedResults,

    // === Config Errors (exit code 7) ===
    ConfigError,

    // === I/O Errors (exit code 8) ===
    IoError,
    JsonError,
    YamlError,

    // === Internal Errors (exit code 1) ===
    InternalError,
}

impl ErrorCode {
    /// Get the string representation for JSON output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DatabaseNotFound => "DATABASE_NOT_FOUND",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::NotFound => "NOT_FOUND",
            Self::PreconditionViolated => "PRECONDITION_VIOLATED",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::InvalidStatus => "INVALID_STATUS",
            Self::StaleReference => "STALE_REFERENCE",
            Self::MisalignedResults => "MISALIGNED_RESULTS",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::YamlError => "YAML_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether this error is potentially retryable.
    ///
    /// A stale reference means the report moved under the query; asking
    /// again against a fresh snapshot can succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StaleReference | Self::ValidationFailed | Self::InvalidStatus
        )
    }

    /// Get the exit code for this error category.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::DatabaseNotFound
            | Self::DatabaseError
            | Self::NotInitialized
            | Self::AlreadyInitialized => 2,
            Self::NotFound | Self::PreconditionViolated => 3,
            Self::ValidationFailed | Self::InvalidStatus => 4,
            Self::StaleReference | Self::MisalignedResults => 5,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError | Self::YamlError => 8,
            Self::InternalError => 1,
        }
    }
}

/// Structured error for machine-parseable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional hint for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether the operation can be retried
    pub retryable: bool,
    /// Additional context data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl StructuredError {
    /// Create a new structured error from an `AriaError`.
    #[must_use]
    pub fn from_error(err: &AriaError) -> Self {
        let (code, context) = Self::extract_code_and_context(err);
        let hint = Self::generate_hint(err);

        Self {
            code,
            message: err.to_string(),
            hint,
            retryable: code.is_retryable(),
            context,
        }
    }

    /// Serialize to JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "code": self.code.as_str(),
                "message": self.message,
                "hint": self.hint,
                "retryable": self.retryable,
                "context": self.context,
            }
        })
    }

    /// Format for human-readable output.
    #[must_use]
    pub fn to_human(&self, color: bool) -> String {
        let mut output = String::new();

        if color {
            output.push_str("\x1b[31mError:\x1b[0m ");
        } else {
            output.push_str("Error: ");
        }

        output.push_str(&self.message);

        if let Some(hint) = &self.hint {
            output.push('\n');
            if color {
                output.push_str("\x1b[33mHint:\x1b[0m ");
            } else {
                output.push_str("Hint: ");
            }
            output.push_str(hint);
        }

        output
    }

    fn extract_code_and_context(err: &AriaError) -> (ErrorCode, Option<Value>) {
        match err {
            AriaError::DatabaseNotFound { path } => (
                ErrorCode::DatabaseNotFound,
                Some(json!({"path": path.display().to_string()})),
            ),
            AriaError::Database(_) => (ErrorCode::DatabaseError, None),
            AriaError::NotInitialized => (ErrorCode::NotInitialized, None),
            AriaError::AlreadyInitialized { path } => (
                ErrorCode::AlreadyInitialized,
                Some(json!({"path": path.display().to_string()})),
            ),
            AriaError::NotFound { kind, id } => (
                ErrorCode::NotFound,
                Some(json!({"kind": kind, "searched_id": id})),
            ),
            AriaError::Precondition(reason) => (
                ErrorCode::PreconditionViolated,
                Some(json!({"reason": reason})),
            ),
            AriaError::StaleReference {
                kind,
                id,
                report_id,
            } => (
                ErrorCode::StaleReference,
                Some(json!({"kind": kind, "id": id, "test_plan_report_id": report_id})),
            ),
            AriaError::MisalignedResults { test_id, detail } => (
                ErrorCode::MisalignedResults,
                Some(json!({"test_id": test_id, "detail": detail})),
            ),
            AriaError::Validation { field, reason } => (
                ErrorCode::ValidationFailed,
                Some(json!({"field": field, "reason": reason})),
            ),
            AriaError::InvalidStatus { status } => (
                ErrorCode::InvalidStatus,
                Some(json!({
                    "status": status,
                    "valid_values": ["DRAFT", "IN_REVIEW", "FINALIZED"],
                })),
            ),
            AriaError::Config(_) => (ErrorCode::ConfigError, None),
            AriaError::Io(_) => (ErrorCode::IoError, None),
            AriaError::Json(_) => (ErrorCode::JsonError, None),
            AriaError::Yaml(_) => (ErrorCode::YamlError, None),
            AriaError::WithContext { context, source } => (
                Self::code_for_source(source.as_ref()),
                Some(json!({"context": context})),
            ),
            AriaError::Other(_) => (ErrorCode::InternalError, None),
        }
    }

    fn code_for_source(source: &(dyn std::error::Error + Send + Sync + 'static)) -> ErrorCode {
        if source.is::<std::io::Error>() {
            ErrorCode::IoError
        } else if source.is::<serde_json::Error>() {
            ErrorCode::JsonError
        } else if source.is::<serde_yaml::Error>() {
            ErrorCode::YamlError
        } else {
            ErrorCode::InternalError
        }
    }

    fn generate_hint(err: &AriaError) -> Option<String> {
        if let AriaError::InvalidStatus { status } = err {
            if let Some(detected) = detect_status_intent(status) {
                return Some(format!("Did you mean {detected}?"));
            }
        }

        if let Some(suggestion) = err.suggestion() {
            return Some(suggestion.to_string());
        }

        match err {
            AriaError::NotFound { kind, .. } if kind.starts_with("test plan report") => {
                Some("Run 'aat reports' to see available reports.".to_string())
            }
            AriaError::Database(_) => {
                Some("Check that the database is not open in another process.".to_string())
            }
            _ => None,
        }
    }
}

/// Map common shorthand for report statuses to the canonical value.
#[must_use]
pub fn detect_status_intent(input: &str) -> Option<&'static str> {
    let normalized = input.trim().to_lowercase();
    match normalized.as_str() {
        "done" | "final" | "complete" | "completed" | "published" => Some("FINALIZED"),
        "review" | "reviewing" | "pending" => Some("IN_REVIEW"),
        "new" | "open" | "wip" => Some("DRAFT"),
        _ => None,
    }
}
