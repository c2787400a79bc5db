//! Date/time utilities for filevault.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

/// Storage format for timestamps (UTC, matches SQLite `datetime('now')`).
pub const DB_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current UTC time in the database storage format.
pub fn now_string() -> String {
    Utc::now().format(DB_FORMAT).to_string()
}

/// Format a UTC time in the database storage format.
pub fn to_db_string(dt: &DateTime<Utc>) -> String {
    dt.format(DB_FORMAT).to_string()
}

/// UTC time `days` from now, in the database storage format.
pub fn days_from_now(days: i64) -> String {
    to_db_string(&(Utc::now() + Duration::days(days)))
}

/// Parse a database datetime string back into a UTC time.
pub fn parse_db_string(datetime_str: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(datetime_str, DB_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Convert a database datetime string (YYYY-MM-DD HH:MM:SS) to RFC3339 format.
///
/// The database stores times in UTC, so this function appends 'Z' to indicate UTC.
pub fn to_rfc3339(datetime_str: &str) -> String {
    format!("{}Z", datetime_str.replace(' ', "T"))
}
