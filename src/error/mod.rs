//! Error types and handling for `aria_at_rust`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Supports `anyhow` integration at the CLI edge
//! - Provides recovery hints for user-facing errors
//! - Provides structured JSON output for scripted callers

mod context;
mod structured;

pub use context::{OptionExt, ResultExt};
pub use structured::{ErrorCode, StructuredError};

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for `aria_at_rust` operations.
#[derive(Error, Debug)]
pub enum AriaError {
    // === Storage Errors ===
    /// Database file not found at the specified path.
    #[error("Database not found at '{path}'")]
    DatabaseNotFound { path: PathBuf },

    /// `SQLite` database error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A record looked up by key does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A store operation was called without the input it requires.
    #[error("Precondition violated: {0}")]
    Precondition(String),

    // === Conflict Engine Errors ===
    /// A conflict reference no longer resolves inside the loaded report.
    #[error("Stale reference: {kind} '{id}' is not part of test plan report {report_id}")]
    StaleReference {
        kind: &'static str,
        id: String,
        report_id: i64,
    },

    /// Finalized results for one test do not share the same shape.
    #[error("Misaligned results for test '{test_id}': {detail}")]
    MisalignedResults { test_id: String, detail: String },

    // === Validation Errors ===
    /// Field validation failed.
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Invalid report status value.
    #[error("Invalid status: {status}")]
    InvalidStatus { status: String },

    // === Configuration Errors ===
    /// Configuration file error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Workspace not initialized.
    #[error("Workspace not initialized: run 'aat init' first")]
    NotInitialized,

    /// Already initialized.
    #[error("Already initialized at '{path}'")]
    AlreadyInitialized { path: PathBuf },

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // === Wrapped errors ===
    /// Error with additional context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Wrapped anyhow error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AriaError {
    /// Can the user fix this without code changes?
    #[must_use]
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DatabaseNotFound { .. }
                | Self::NotInitialized
                | Self::NotFound { .. }
                | Self::Validation { .. }
                | Self::InvalidStatus { .. }
                | Self::StaleReference { .. }
        )
    }

    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run: aat init"),
            Self::DatabaseNotFound { .. } => Some("Check path or run: aat init"),
            Self::AlreadyInitialized { .. } => Some("Use --force to reinitialize"),
            Self::StaleReference { .. } => {
                Some("The report changed after conflicts were detected; run the query again")
            }
            Self::MisalignedResults { .. } => Some(
                "Results were submitted against different test revisions; set misaligned-results: skip to ignore them",
            ),
            Self::InvalidStatus { .. } => Some("Valid statuses: DRAFT, IN_REVIEW, FINALIZED"),
            _ => None,
        }
    }

    /// Create a validation error for a specific field.
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a not-found error for a record kind.
    #[must_use]
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Result type using `AriaError`.
pub type Result<T> = std::result::Result<T, AriaError>;
