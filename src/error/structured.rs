//! Structured error bodies for API clients.
//!
//! Provides machine-parseable error information with:
//! - Error codes for categorization
//! - Hints for self-correction
//! - Retryability flags
//! - Per-field context for validation failures
//!
//! Intent detection recognizes near-miss enum values (`done`, `in-progress`,
//! `urgent`) and turns them into a hint. The value is still rejected.

#![allow(clippy::option_if_let_else)]

use crate::error::IssueTrackerError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Machine-readable error codes.
///
/// These codes are stable and can be used for programmatic error handling.
/// Format: `SCREAMING_SNAKE_CASE` for easy parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // === Storage Errors (500) ===
    /// Database operation failed
    DatabaseError,

    // === Issue Errors (404) ===
    /// Issue with specified ID not found
    IssueNotFound,

    // === Validation Errors (422) ===
    /// Field validation failed
    ValidationFailed,
    /// Invalid status value
    InvalidStatus,
    /// Invalid priority value
    InvalidPriority,

    // === Config Errors ===
    /// Configuration error
    ConfigError,

    // === Health (503) ===
    /// Storage did not answer the health probe
    Unavailable,

    // === Internal Errors (500) ===
    /// Unexpected internal error
    InternalError,
}

impl ErrorCode {
    /// Get the string representation for JSON output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DatabaseError => "DATABASE_ERROR",
            Self::IssueNotFound => "ISSUE_NOT_FOUND",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::InvalidStatus => "INVALID_STATUS",
            Self::InvalidPriority => "INVALID_PRIORITY",
            Self::ConfigError => "CONFIG_ERROR",
            Self::Unavailable => "UNAVAILABLE",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether resending the request (after fixing it) can succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ValidationFailed | Self::InvalidStatus | Self::InvalidPriority | Self::Unavailable
        )
    }

    /// HTTP status for this error category.
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::IssueNotFound => StatusCode::NOT_FOUND,
            Self::ValidationFailed | Self::InvalidStatus | Self::InvalidPriority => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::DatabaseError | Self::ConfigError | Self::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
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
    /// Create a new structured error from an `IssueTrackerError`.
    ///
    /// Storage and internal failures get a generic message so engine
    /// details never reach the caller.
    #[must_use]
    pub fn from_error(err: &IssueTrackerError) -> Self {
        let (code, context) = Self::extract_code_and_context(err);
        let hint = Self::generate_hint(err);
        let message = match code {
            ErrorCode::DatabaseError => "Storage operation failed".to_string(),
            ErrorCode::InternalError => "Internal server error".to_string(),
            _ => err.to_string(),
        };

        Self {
            code,
            message,
            hint,
            retryable: code.is_retryable(),
            context,
        }
    }

    /// Structured error for a failed health probe.
    #[must_use]
    pub fn unavailable(reason: &str) -> Self {
        Self {
            code: ErrorCode::Unavailable,
            message: format!("Service unavailable: {reason}"),
            hint: Some("Retry once the database is reachable".to_string()),
            retryable: true,
            context: None,
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

    /// Format for human-readable output (start-up failures on stderr).
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

    fn extract_code_and_context(err: &IssueTrackerError) -> (ErrorCode, Option<Value>) {
        match err {
            IssueTrackerError::Database(_) => (ErrorCode::DatabaseError, None),
            IssueTrackerError::Join(_)
            | IssueTrackerError::PoolPoisoned
            | IssueTrackerError::Io(_)
            | IssueTrackerError::Json(_)
            | IssueTrackerError::Yaml(_) => (ErrorCode::InternalError, None),
            IssueTrackerError::IssueNotFound { id } => {
                (ErrorCode::IssueNotFound, Some(json!({"id": id})))
            }
            IssueTrackerError::Validation { .. } | IssueTrackerError::ValidationErrors { .. } => (
                ErrorCode::ValidationFailed,
                Some(json!({ "errors": errors_json(err) })),
            ),
            IssueTrackerError::InvalidStatus { status } => (
                ErrorCode::InvalidStatus,
                Some(json!({
                    "provided": status,
                    "valid_values": VALID_STATUSES,
                    "errors": errors_json(err),
                })),
            ),
            IssueTrackerError::InvalidPriority { priority } => (
                ErrorCode::InvalidPriority,
                Some(json!({
                    "provided": priority,
                    "valid_values": VALID_PRIORITIES,
                    "errors": errors_json(err),
                })),
            ),
            IssueTrackerError::Config(_) => (ErrorCode::ConfigError, None),
        }
    }

    fn generate_hint(err: &IssueTrackerError) -> Option<String> {
        if let Some(suggestion) = err.suggestion() {
            return Some(suggestion.to_string());
        }

        match err {
            IssueTrackerError::InvalidStatus { status } => Some(
                detect_status_intent(status).map_or_else(
                    || format!("Valid statuses: {}", VALID_STATUSES.join(", ")),
                    |detected| format!("Did you mean status={detected}?"),
                ),
            ),
            IssueTrackerError::InvalidPriority { priority } => Some(
                detect_priority_intent(priority).map_or_else(
                    || format!("Valid priorities: {}", VALID_PRIORITIES.join(", ")),
                    |detected| format!("Did you mean priority={detected}?"),
                ),
            ),
            _ => None,
        }
    }
}

impl From<&IssueTrackerError> for StructuredError {
    fn from(err: &IssueTrackerError) -> Self {
        Self::from_error(err)
    }
}

impl IntoResponse for StructuredError {
    fn into_response(self) -> Response {
        (self.code.http_status(), Json(self.to_json())).into_response()
    }
}

impl IntoResponse for IssueTrackerError {
    fn into_response(self) -> Response {
        let structured = StructuredError::from_error(&self);
        if self.is_user_recoverable() {
            tracing::debug!(error = %self, code = structured.code.as_str(), "request rejected");
        } else {
            tracing::error!(error = %self, code = structured.code.as_str(), "request failed");
        }
        structured.into_response()
    }
}

fn errors_json(err: &IssueTrackerError) -> Vec<Value> {
    err.field_errors()
        .iter()
        .map(|e| json!({"field": e.field, "message": e.message}))
        .collect()
}

// === Valid Values ===

/// Valid status values, in lifecycle order.
pub const VALID_STATUSES: [&str; 4] = ["open", "in_progress", "resolved", "closed"];

/// Valid priority values, lowest first.
pub const VALID_PRIORITIES: [&str; 4] = ["low", "medium", "high", "critical"];

/// Status synonyms for intent detection.
static STATUS_SYNONYMS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    [
        ("done", "resolved"),
        ("fixed", "resolved"),
        ("complete", "resolved"),
        ("completed", "resolved"),
        ("finished", "closed"),
        ("wontfix", "closed"),
        ("wip", "in_progress"),
        ("working", "in_progress"),
        ("active", "in_progress"),
        ("started", "in_progress"),
        ("new", "open"),
        ("todo", "open"),
        ("pending", "open"),
    ]
    .into_iter()
    .collect()
});

/// Priority synonyms for intent detection.
static PRIORITY_SYNONYMS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    [
        ("crit", "critical"),
        ("urgent", "critical"),
        ("highest", "critical"),
        ("blocker", "critical"),
        ("important", "high"),
        ("normal", "medium"),
        ("default", "medium"),
        ("med", "medium"),
        ("minor", "low"),
        ("lowest", "low"),
        ("trivial", "low"),
    ]
    .into_iter()
    .collect()
});

// === Intent Detection ===

/// Detect what status the caller likely meant.
fn detect_status_intent(input: &str) -> Option<&'static str> {
    detect_intent(input, &VALID_STATUSES, &STATUS_SYNONYMS)
}

/// Detect what priority the caller likely meant.
fn detect_priority_intent(input: &str) -> Option<&'static str> {
    detect_intent(input, &VALID_PRIORITIES, &PRIORITY_SYNONYMS)
}

fn detect_intent(
    input: &str,
    valid: &[&'static str],
    synonyms: &HashMap<&'static str, &'static str>,
) -> Option<&'static str> {
    let lower = input.trim().to_lowercase().replace(['-', ' '], "_");
    if lower.is_empty() {
        return None;
    }

    // Case or separator mismatch (`Open`, `in-progress`)
    if let Some(&exact) = valid.iter().find(|v| **v == lower) {
        return Some(exact);
    }

    if let Some(&canonical) = synonyms.get(lower.as_str()) {
        return Some(canonical);
    }

    if let Some(&prefixed) = valid.iter().find(|v| v.starts_with(&lower)) {
        return Some(prefixed);
    }

    // Typos: closest value within two edits
    valid
        .iter()
        .map(|v| (levenshtein_distance(&lower, v), *v))
        .filter(|(dist, _)| *dist <= 2)
        .min_by_key(|(dist, _)| *dist)
        .map(|(_, v)| v)
}

// === Levenshtein Distance ===

/// Calculate the Levenshtein distance between two strings.
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_len = a.chars().count();
    let b_len = b.chars().count();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut matrix = vec![vec![0; b_len + 1]; a_len + 1];

    for (i, row) in matrix.iter_mut().enumerate().take(a_len + 1) {
        row[0] = i;
    }
    for (j, item) in matrix[0].iter_mut().enumerate().take(b_len + 1) {
        *item = j;
    }

    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    for (i, a_char) in a_chars.iter().enumerate() {
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            matrix[i + 1][j + 1] = std::cmp::min(
                std::cmp::min(matrix[i][j + 1] + 1, matrix[i + 1][j] + 1),
                matrix[i][j] + cost,
            );
        }
    }

    matrix[a_len][b_len]
}
