//! Database error types for lex-db.

use thiserror::Error;

/// Errors from chunk store operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A SQL query failed or returned malformed data.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Expected a result row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// A structural contradiction was detected (missing parent, depth/path
    /// mismatch). Never retried, never silently corrected.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),
}
