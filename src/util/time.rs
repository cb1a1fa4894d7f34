//! Timestamp helpers.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings with
//! microsecond precision (`2025-01-15T12:00:00.123456Z`). Fixed width keeps
//! string comparison in SQL consistent with chronological order.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Timelike, Utc};
use serde::Serializer;

/// Current time truncated to the precision that survives a storage round-trip.
#[must_use]
pub fn now() -> DateTime<Utc> {
    truncate_to_micros(Utc::now())
}

/// A write timestamp that never moves backwards past `previous`.
///
/// Guards `updated_at >= created_at` against wall-clock steps.
#[must_use]
pub fn advance_from(previous: DateTime<Utc>) -> DateTime<Utc> {
    now().max(previous)
}

/// Format a timestamp for storage.
#[must_use]
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `serialize_with` adapter emitting the storage format.
///
/// # Errors
///
/// Propagates serializer errors.
#[allow(clippy::trivially_copy_pass_by_ref)]
pub fn serialize_timestamp<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(*dt))
}

/// Parse a stored timestamp.
///
/// Accepts RFC 3339 and the `YYYY-MM-DD HH:MM:SS` form SQLite's own
/// `datetime()` produces, in case rows were inserted by hand.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn truncate_to_micros(dt: DateTime<Utc>) -> DateTime<Utc> {
    let micros = dt.nanosecond() / 1_000 * 1_000;
    dt.with_nanosecond(micros).unwrap_or(dt)
}
