//! Indexing error kinds.
//!
//! Every kind is part of the public contract: "document already indexed" is
//! a result variant, not control flow by exception, and the CLI maps kinds
//! to exit codes.

use lex_core::DocumentId;
use lex_db::DatabaseError;
use lex_embeddings::EmbeddingError;
use thiserror::Error;

/// Errors from the indexing orchestrator.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Malformed file path, unreadable file, or invalid options.
    #[error("Invalid input at '{path}': {reason}")]
    InvalidInput { path: String, reason: String },

    /// Non-forcing index of an existing document.
    #[error("Document '{0}' is already indexed (pass force to reindex)")]
    AlreadyIndexed(DocumentId),

    /// Structural contradiction detected by the chunk store. Never retried.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Persistence backend failed after retries; retryable by the caller.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(DatabaseError),

    /// Embedding client failed after its per-text fallback; retryable.
    #[error("Embedding failure: {0}")]
    EmbeddingFailure(#[from] EmbeddingError),

    /// Deadline expired or explicit cancellation; no orphan writes remain.
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<DatabaseError> for IndexError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::InvariantViolation(msg) => Self::InvariantViolation(msg),
            other => Self::StoreUnavailable(other),
        }
    }
}

impl IndexError {
    /// Short machine-readable kind tag.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::AlreadyIndexed(_) => "already_indexed",
            Self::InvariantViolation(_) => "invariant_violation",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::EmbeddingFailure(_) => "embedding_failure",
            Self::Cancelled => "cancelled",
        }
    }

    /// The offending file path, when applicable.
    #[must_use]
    pub fn file(&self) -> Option<&str> {
        match self {
            Self::InvalidInput { path, .. } => Some(path),
            _ => None,
        }
    }
}
