//! Error types and handling for `issue_tracker`.
//!
//! Every failure a request can hit is a variant of [`IssueTrackerError`].
//! The HTTP layer never builds error bodies by hand; it converts the error
//! into a [`StructuredError`] which owns the status code, the stable
//! machine-readable code and the JSON shape.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Validation errors carry per-field detail
//! - Storage failures are reported generically to callers and logged in full

mod structured;

pub use structured::{ErrorCode, StructuredError};

use thiserror::Error;

/// Primary error type for `issue_tracker` operations.
#[derive(Error, Debug)]
pub enum IssueTrackerError {
    // === Storage Errors ===
    /// `SQLite` database error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A blocking storage task panicked or was cancelled.
    #[error("Storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// A pooled connection mutex was poisoned by a panicking request.
    #[error("Connection pool poisoned")]
    PoolPoisoned,

    // === Issue Errors ===
    /// Issue with the specified ID was not found.
    #[error("Issue with id {id} not found")]
    IssueNotFound { id: i64 },

    // === Validation Errors ===
    /// Field validation failed.
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Multiple validation errors occurred.
    #[error("Validation failed: {}", join_errors(.errors))]
    ValidationErrors { errors: Vec<ValidationError> },

    /// Invalid status value.
    #[error("Invalid status: {status}")]
    InvalidStatus { status: String },

    /// Invalid priority value.
    #[error("Invalid priority: {priority}")]
    InvalidPriority { priority: String },

    // === Configuration Errors ===
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// A single field validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// The reason for the validation failure.
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl IssueTrackerError {
    /// Can the caller fix this by changing the request?
    #[must_use]
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::IssueNotFound { .. }
                | Self::Validation { .. }
                | Self::ValidationErrors { .. }
                | Self::InvalidStatus { .. }
                | Self::InvalidPriority { .. }
        )
    }

    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::IssueNotFound { .. } => Some("List issues with GET /issues to see valid ids"),
            Self::Validation { .. } | Self::ValidationErrors { .. } => {
                Some("Fix the listed fields and resend the request")
            }
            Self::Config(_) => Some("Check flags, ISSUES_* environment variables and issues.yaml"),
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

    /// Create from multiple validation errors.
    #[must_use]
    pub fn from_validation_errors(errors: Vec<ValidationError>) -> Self {
        if errors.len() == 1 {
            let err = &errors[0];
            Self::Validation {
                field: err.field.clone(),
                reason: err.message.clone(),
            }
        } else {
            Self::ValidationErrors { errors }
        }
    }

    /// Field-level detail for every validation flavour.
    ///
    /// Non-validation errors return an empty list.
    #[must_use]
    pub fn field_errors(&self) -> Vec<ValidationError> {
        match self {
            Self::Validation { field, reason } => vec![ValidationError::new(field, reason)],
            Self::ValidationErrors { errors } => errors.clone(),
            Self::InvalidStatus { status } => vec![ValidationError::new(
                "status",
                format!("unknown status '{status}'"),
            )],
            Self::InvalidPriority { priority } => vec![ValidationError::new(
                "priority",
                format!("unknown priority '{priority}'"),
            )],
            _ => Vec::new(),
        }
    }
}

/// Result type using `IssueTrackerError`.
pub type Result<T> = std::result::Result<T, IssueTrackerError>;
