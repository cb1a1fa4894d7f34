//! Database schema definitions.

use rusqlite::{Connection, Result};

pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// The complete SQL schema for the issues database.
pub const SCHEMA_SQL: &str = r"
    -- Issues table
    -- AUTOINCREMENT keeps ids monotonic: a deleted id is never handed out again.
    CREATE TABLE IF NOT EXISTS issues (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT,
        status TEXT NOT NULL DEFAULT 'open',
        priority TEXT NOT NULL DEFAULT 'medium',
        reporter TEXT NOT NULL,
        assignee TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        CHECK (length(trim(title)) >= 1),
        CHECK (length(trim(reporter)) >= 1),
        CHECK (status IN ('open', 'in_progress', 'resolved', 'closed')),
        CHECK (priority IN ('low', 'medium', 'high', 'critical')),
        CHECK (updated_at >= created_at)
    );

    CREATE INDEX IF NOT EXISTS idx_issues_title ON issues(title);
    CREATE INDEX IF NOT EXISTS idx_issues_status ON issues(status);
    CREATE INDEX IF NOT EXISTS idx_issues_priority ON issues(priority);
    CREATE INDEX IF NOT EXISTS idx_issues_assignee ON issues(assignee);
";

/// Apply the schema to the database.
///
/// Idempotent: every statement uses `IF NOT EXISTS`, so this runs on every
/// start and creates the table only on first run.
///
/// # Errors
///
/// Returns an error if the SQL execution fails or pragmas cannot be set.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    // WAL lets the read pool see committed rows while a write is in flight
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.execute_batch(SCHEMA_SQL)?;
    conn.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_apply_schema() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).expect("Failed to apply schema");

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert!(tables.contains(&"issues".to_string()));

        // In-memory DBs use MEMORY journaling, regardless of what we set
        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert!(journal_mode.to_uppercase() == "WAL" || journal_mode.to_uppercase() == "MEMORY");

        let version: i32 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_apply_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        apply_schema(&conn).unwrap();
    }

    #[test]
    fn test_check_constraints_reject_bad_enums() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO issues (title, status, priority, reporter, created_at, updated_at)
             VALUES ('t', 'blocked', 'medium', 'r', '2025-01-01T00:00:00.000000Z', '2025-01-01T00:00:00.000000Z')",
            [],
        );
        assert!(result.is_err());

        let result = conn.execute(
            "INSERT INTO issues (title, status, priority, reporter, created_at, updated_at)
             VALUES ('t', 'open', 'urgent', 'r', '2025-01-01T00:00:00.000000Z', '2025-01-01T00:00:00.000000Z')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_check_constraints_reject_blank_title() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO issues (title, reporter, created_at, updated_at)
             VALUES ('  ', 'r', '2025-01-01T00:00:00.000000Z', '2025-01-01T00:00:00.000000Z')",
            [],
        );
        assert!(result.is_err());
    }
}
