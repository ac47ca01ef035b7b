//! Row-to-entity parsing helpers.
//!
//! Converting `libsql::Row` (column-indexed) into typed structs is repetitive
//! and error-prone; these helpers isolate the parsing logic and the dual
//! datetime format issue (`SQLite`'s `datetime('now')` vs Rust's
//! `to_rfc3339()`).

use chrono::{DateTime, Utc};

use crate::error::DatabaseError;

/// Parse a required TEXT column as `DateTime<Utc>`.
///
/// Handles both RFC 3339 (`"2026-08-01T14:30:00+00:00"`) and `SQLite`'s
/// default format (`"2026-08-01 14:30:00"`).
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string matches neither format.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| DatabaseError::Query(format!("Failed to parse datetime '{s}': {e}")))
}

/// Parse a TEXT column into a serde-deserializable enum.
///
/// Works with all lex-core enums that use `#[serde(rename_all = "snake_case")]`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string matches no enum variant.
pub fn parse_enum<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, DatabaseError> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|e| DatabaseError::Query(format!("Failed to parse enum from '{s}': {e}")))
}

/// Read a nullable TEXT column. Returns `None` for both SQL NULL and empty
/// string.
///
/// `row.get::<String>(idx)` on a NULL column returns an error, not `""` —
/// nullable columns must be read as `Option<String>`.
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails.
pub fn get_opt_string(row: &libsql::Row, idx: i32) -> Result<Option<String>, DatabaseError> {
    match row.get::<Option<String>>(idx)? {
        Some(s) if s.is_empty() => Ok(None),
        other => Ok(other),
    }
}

/// Parse an optional TEXT column containing a JSON object into a serde map.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if a non-empty string is not a JSON object.
pub fn parse_metadata(
    s: Option<&str>,
) -> Result<serde_json::Map<String, serde_json::Value>, DatabaseError> {
    match s {
        Some(s) if !s.is_empty() => match serde_json::from_str(s) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(_) => Err(DatabaseError::Query(
                "metadata column is not a JSON object".to_string(),
            )),
            Err(e) => Err(DatabaseError::Query(format!("Invalid JSON in metadata: {e}"))),
        },
        _ => Ok(serde_json::Map::new()),
    }
}

/// Read an INTEGER column as `usize`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` on negative values.
pub fn get_usize(row: &libsql::Row, idx: i32) -> Result<usize, DatabaseError> {
    let value = row.get::<i64>(idx)?;
    usize::try_from(value)
        .map_err(|_| DatabaseError::Query(format!("negative count in column {idx}: {value}")))
}
