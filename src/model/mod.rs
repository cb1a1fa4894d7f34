//! Core data types for `issue_tracker`.
//!
//! This module defines the fundamental types used throughout the application:
//! - `Issue` - The tracked record, one row of the `issues` table
//! - `Status` - Issue lifecycle states
//! - `Priority` - Urgency levels

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Issue lifecycle status.
///
/// No transition rules are enforced; any status may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Open,
    InProgress,
    Resolved,
    Closed,
}

const STATUS_NAMES: &[&str] = &["open", "in_progress", "resolved", "closed"];
const PRIORITY_NAMES: &[&str] = &["low", "medium", "high", "critical"];

impl Status {
    pub const ALL: [Self; 4] = [Self::Open, Self::InProgress, Self::Resolved, Self::Closed];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Exact, case-sensitive match. Anything else is rejected, never coerced.
impl FromStr for Status {
    type Err = crate::error::IssueTrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| crate::error::IssueTrackerError::InvalidStatus {
                status: s.to_string(),
            })
    }
}

/// Only the bare string form is accepted; serde's map form for unit
/// variants (`{"closed": null}`) is a type error.
impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse()
            .map_err(|_| de::Error::unknown_variant(&raw, STATUS_NAMES))
    }
}

/// Issue priority, ordered from `Low` to `Critical`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    JsonSchema,
    Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = crate::error::IssueTrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|priority| priority.as_str() == s)
            .ok_or_else(|| crate::error::IssueTrackerError::InvalidPriority {
                priority: s.to_string(),
            })
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse()
            .map_err(|_| de::Error::unknown_variant(&raw, PRIORITY_NAMES))
    }
}

/// The tracked record.
///
/// This is also the response shape: every stored field, including the
/// system-managed `id` and timestamps, is serialized back to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Issue {
    /// System-assigned identifier, never reused.
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: Status,
    pub priority: Priority,
    /// Who reported the issue (name or email).
    pub reporter: String,
    pub assignee: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mutable fields of an issue, fully specified.
///
/// Used both for inserts and for full replacement. Defaults have already
/// been applied, so a `None` here means "store null".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IssueFields {
    pub title: String,
    pub description: Option<String>,
    pub status: Status,
    pub priority: Priority,
    pub reporter: String,
    pub assignee: Option<String>,
}

impl IssueFields {
    /// Fields for a new issue with every optional value at its default.
    #[must_use]
    pub fn new(title: impl Into<String>, reporter: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            reporter: reporter.into(),
            ..Self::default()
        }
    }
}
