//! `SQLite` storage implementation.
//!
//! One write connection serializes every mutation behind a mutex. Reads go
//! to a small set of read-only connections picked round-robin; under WAL they
//! see every committed write without blocking the writer. An in-memory
//! database cannot be shared across connections, so it runs with an empty
//! read pool and all reads fall back to the writer.

use crate::error::{IssueTrackerError, Result};
use crate::model::{Issue, IssueFields, Priority, Status};
use crate::storage::schema::apply_schema;
use crate::util::time::{advance_from, format_timestamp, now, parse_timestamp};
use rusqlite::types::Type;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Transaction, TransactionBehavior};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

const ISSUE_COLUMNS: &str =
    "id, title, description, status, priority, reporter, assignee, created_at, updated_at";

/// Connection pool settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageOptions {
    /// Number of read-only connections. Zero routes reads to the writer.
    pub read_pool_size: usize,
    /// How long a connection waits on a locked database before failing.
    pub busy_timeout: Duration,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            read_pool_size: 4,
            busy_timeout: Duration::from_millis(5_000),
        }
    }
}

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    read_cursor: AtomicUsize,
    path: Option<PathBuf>,
}

impl SqliteStorage {
    /// Open (creating if needed) the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if a connection cannot be established or schema application fails.
    pub fn open(path: &Path, options: StorageOptions) -> Result<Self> {
        let writer = Connection::open(path)?;
        writer.busy_timeout(options.busy_timeout)?;
        apply_schema(&writer)?;

        // Readers open after the schema exists; read-only flags reject stray writes
        let readers = (0..options.read_pool_size)
            .map(|_| -> Result<Mutex<Connection>> {
                let conn = Connection::open_with_flags(
                    path,
                    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
                )?;
                conn.busy_timeout(options.busy_timeout)?;
                Ok(Mutex::new(conn))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(path = %path.display(), readers = readers.len(), "opened issue database");

        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            read_cursor: AtomicUsize::new(0),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self {
            writer: Mutex::new(conn),
            readers: Vec::new(),
            read_cursor: AtomicUsize::new(0),
            path: None,
        })
    }

    /// Database file path, `None` for in-memory storage.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn writer(&self) -> Result<MutexGuard<'_, Connection>> {
        self.writer
            .lock()
            .map_err(|_| IssueTrackerError::PoolPoisoned)
    }

    /// Run a read against the next pooled read connection.
    fn read<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R>,
    {
        if self.readers.is_empty() {
            let conn = self.writer()?;
            return f(&*conn);
        }
        let index = self.read_cursor.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[index]
            .lock()
            .map_err(|_| IssueTrackerError::PoolPoisoned)?;
        f(&*conn)
    }

    /// Execute a mutation inside one immediate transaction.
    ///
    /// The transaction is rolled back if `f` fails, so a failed or
    /// not-found write never applies partially.
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails. The transaction is rolled back on error.
    pub fn mutate<F, R>(&self, op: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction) -> Result<R>,
    {
        let mut conn = self.writer()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let result = f(&tx)?;
        tx.commit()?;
        debug!(op, "committed");
        Ok(result)
    }

    /// Create a new issue. The database assigns the id; both timestamps
    /// are set to the same instant.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails (e.g. a CHECK constraint).
    pub fn create_issue(&self, fields: &IssueFields) -> Result<Issue> {
        self.mutate("create_issue", |tx| {
            let timestamp = format_timestamp(now());
            tx.execute(
                "INSERT INTO issues (title, description, status, priority, reporter, assignee,
                                     created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                rusqlite::params![
                    fields.title,
                    fields.description,
                    fields.status.as_str(),
                    fields.priority.as_str(),
                    fields.reporter,
                    fields.assignee,
                    timestamp,
                    timestamp,
                ],
            )?;
            let id = tx.last_insert_rowid();
            debug!(id, "created issue");
            fetch_issue(tx, id)?.ok_or(IssueTrackerError::IssueNotFound { id })
        })
    }

    /// Get an issue by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_issue(&self, id: i64) -> Result<Option<Issue>> {
        self.read(|conn| fetch_issue(conn, id))
    }

    /// List issues matching `filters`, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_issues(&self, filters: &ListFilters) -> Result<Vec<Issue>> {
        self.read(|conn| query_page(conn, filters))
    }

    /// Count issues matching `filters`, ignoring `skip` and `limit`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn count_issues(&self, filters: &ListFilters) -> Result<usize> {
        self.read(|conn| query_count(conn, filters))
    }

    /// One page of issues plus the unpaged total, read from a single
    /// snapshot so the two always agree.
    ///
    /// # Errors
    ///
    /// Returns an error if either query fails.
    pub fn list_page(&self, filters: &ListFilters) -> Result<(Vec<Issue>, usize)> {
        self.read(|conn| {
            let tx = conn.unchecked_transaction()?;
            let issues = query_page(&tx, filters)?;
            let total = query_count(&tx, filters)?;
            tx.commit()?;
            Ok((issues, total))
        })
    }

    /// Overwrite every mutable field of an issue.
    ///
    /// Returns `None` (and changes nothing) if the issue does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn replace_issue(&self, id: i64, fields: &IssueFields) -> Result<Option<Issue>> {
        self.mutate("replace_issue", |tx| {
            let Some(existing) = fetch_issue(tx, id)? else {
                return Ok(None);
            };

            tx.execute(
                "UPDATE issues SET
                    title = ?, description = ?, status = ?, priority = ?,
                    reporter = ?, assignee = ?, updated_at = ?
                 WHERE id = ?",
                rusqlite::params![
                    fields.title,
                    fields.description,
                    fields.status.as_str(),
                    fields.priority.as_str(),
                    fields.reporter,
                    fields.assignee,
                    format_timestamp(advance_from(existing.updated_at)),
                    id,
                ],
            )?;
            debug!(id, "replaced issue");
            fetch_issue(tx, id)
        })
    }

    /// Update only the fields present in `updates`.
    ///
    /// `updated_at` is refreshed even when `updates` is empty. Returns `None`
    /// (and changes nothing) if the issue does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn patch_issue(&self, id: i64, updates: &IssueUpdate) -> Result<Option<Issue>> {
        self.mutate("patch_issue", |tx| {
            let Some(existing) = fetch_issue(tx, id)? else {
                return Ok(None);
            };

            let mut set_clauses: Vec<&str> = vec![];
            let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![];

            let mut add_update = |clause: &'static str, val: Box<dyn rusqlite::ToSql>| {
                set_clauses.push(clause);
                params.push(val);
            };

            if let Some(ref title) = updates.title {
                add_update("title = ?", Box::new(title.clone()));
            }
            if let Some(ref description) = updates.description {
                add_update("description = ?", Box::new(description.clone()));
            }
            if let Some(status) = updates.status {
                add_update("status = ?", Box::new(status.as_str()));
            }
            if let Some(priority) = updates.priority {
                add_update("priority = ?", Box::new(priority.as_str()));
            }
            if let Some(ref reporter) = updates.reporter {
                add_update("reporter = ?", Box::new(reporter.clone()));
            }
            if let Some(ref assignee) = updates.assignee {
                add_update("assignee = ?", Box::new(assignee.clone()));
            }

            // Always update updated_at
            add_update(
                "updated_at = ?",
                Box::new(format_timestamp(advance_from(existing.updated_at))),
            );

            let sql = format!("UPDATE issues SET {} WHERE id = ?", set_clauses.join(", "));
            params.push(Box::new(id));

            let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(AsRef::as_ref).collect();
            tx.execute(&sql, params_refs.as_slice())?;
            debug!(id, fields = set_clauses.len() - 1, "patched issue");

            fetch_issue(tx, id)
        })
    }

    /// Permanently remove an issue. Returns `false` if no such issue existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn delete_issue(&self, id: i64) -> Result<bool> {
        self.mutate("delete_issue", |tx| {
            let removed = tx.execute("DELETE FROM issues WHERE id = ?", [id])?;
            debug!(id, removed, "deleted issue");
            Ok(removed > 0)
        })
    }

    /// Round-trip a trivial query to prove the database answers.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn ping(&self) -> Result<()> {
        self.read(|conn| {
            conn.query_row("SELECT COUNT(*) FROM issues LIMIT 1", [], |row| {
                row.get::<_, i64>(0)
            })?;
            Ok(())
        })
    }
}

fn query_page(conn: &Connection, filters: &ListFilters) -> Result<Vec<Issue>> {
    let (where_sql, mut params) = filters.where_clause();
    let sql =
        format!("SELECT {ISSUE_COLUMNS} FROM issues{where_sql} ORDER BY id ASC LIMIT ? OFFSET ?");

    // SQLite treats a negative LIMIT as "no limit"
    let limit = filters.limit.map_or(-1, to_sql_int);
    params.push(Box::new(limit));
    params.push(Box::new(to_sql_int(filters.skip)));

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(AsRef::as_ref).collect();
    let issues = stmt
        .query_map(params_refs.as_slice(), issue_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(issues)
}

fn query_count(conn: &Connection, filters: &ListFilters) -> Result<usize> {
    let (where_sql, params) = filters.where_clause();
    let sql = format!("SELECT COUNT(*) FROM issues{where_sql}");
    let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(AsRef::as_ref).collect();
    let count: i64 = conn.query_row(&sql, params_refs.as_slice(), |row| row.get(0))?;
    Ok(usize::try_from(count).unwrap_or(0))
}

fn fetch_issue(conn: &Connection, id: i64) -> Result<Option<Issue>> {
    let sql = format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ?");
    let issue = conn
        .prepare_cached(&sql)?
        .query_row([id], issue_from_row)
        .optional()?;
    Ok(issue)
}

fn issue_from_row(row: &rusqlite::Row) -> rusqlite::Result<Issue> {
    Ok(Issue {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: parse_column::<Status>(row, 3)?,
        priority: parse_column::<Priority>(row, 4)?,
        reporter: row.get(5)?,
        assignee: row.get(6)?,
        created_at: timestamp_column(row, 7)?,
        updated_at: timestamp_column(row, 8)?,
    })
}

fn parse_column<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = IssueTrackerError>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn timestamp_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<chrono::DateTime<chrono::Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("invalid timestamp '{raw}'").into(),
        )
    })
}

fn to_sql_int(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Filter and pagination options for listing issues.
///
/// Present filters combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilters {
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub assignee: Option<String>,
    /// Rows to skip in id order.
    pub skip: usize,
    /// Maximum rows to return; `None` returns everything.
    pub limit: Option<usize>,
}

impl ListFilters {
    fn where_clause(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut sql = String::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        let mut conditions: Vec<&str> = Vec::new();

        if let Some(status) = self.status {
            conditions.push("status = ?");
            params.push(Box::new(status.as_str()));
        }
        if let Some(priority) = self.priority {
            conditions.push("priority = ?");
            params.push(Box::new(priority.as_str()));
        }
        if let Some(ref assignee) = self.assignee {
            conditions.push("assignee = ?");
            params.push(Box::new(assignee.clone()));
        }

        if !conditions.is_empty() {
            let _ = write!(sql, " WHERE {}", conditions.join(" AND "));
        }
        (sql, params)
    }
}

/// Fields to change on an issue.
///
/// The outer `Option` is "present in the request"; the inner `Option` on
/// nullable columns is the new value, where `None` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub reporter: Option<String>,
    pub assignee: Option<Option<String>>,
}

impl IssueUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.reporter.is_none()
            && self.assignee.is_none()
    }
}
