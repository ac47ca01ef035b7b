//! Cross-cutting error types for lexis.
//!
//! Domain-specific errors (e.g., `DatabaseError`, `IndexError`) are defined in
//! their respective crates. The CLI maps all crate errors to exit codes.

use thiserror::Error;

/// Errors that can be raised by the core type layer.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Data failed structural validation (tree invariants, field constraints).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A hierarchy path string could not be parsed or is malformed.
    #[error("Invalid hierarchy path: {0}")]
    InvalidPath(String),

    /// An identifier could not be derived or is malformed.
    #[error("Invalid identifier: {0}")]
    InvalidId(String),
}
