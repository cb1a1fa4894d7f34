//! Shared utilities for `issue_tracker`.
//!
//! - Time parsing and formatting (RFC3339, microsecond precision)

pub mod time;
