//! `issue_tracker` - a CRUD REST API for issues, backed by `SQLite`.
//!
//! Layers, leaf first:
//! - [`storage`]: pooled `SQLite` access and the `issues` table
//! - [`model`] and [`validation`]: the issue record and its content rules
//! - [`api`]: request schemas, extractors, handlers and the axum router
//! - [`config`], [`cli`], [`logging`]: process setup for the binary

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod storage;
pub mod util;
pub mod validation;

pub use error::{ErrorCode, IssueTrackerError, Result, StructuredError};
