//! `SQLite` storage layer for `issue_tracker`.
//!
//! Provides the pooled `SqliteStorage` backend and the filter and update
//! types its operations accept.

pub mod schema;
pub mod sqlite;

pub use sqlite::{IssueUpdate, ListFilters, SqliteStorage, StorageOptions};
