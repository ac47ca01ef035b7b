//! Retrieval error kinds.

use thiserror::Error;

/// Errors from the retrieval orchestrator.
#[derive(Debug, Error)]
pub enum RetrieveError {
    /// Options outside their documented ranges.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Chunk store failure; retryable by the caller.
    #[error("Store unavailable: {0}")]
    Store(#[from] lex_db::DatabaseError),

    /// Vector store failure.
    #[error("Vector store failure: {0}")]
    Vector(#[from] lex_vector::VectorStoreError),

    /// Query embedding failed; retryable.
    #[error("Embedding failure: {0}")]
    Embedding(#[from] lex_embeddings::EmbeddingError),

    /// Deadline expired before any group was assembled.
    #[error("Operation cancelled")]
    Cancelled,
}

impl RetrieveError {
    /// Short machine-readable kind tag.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidOptions(_) => "invalid_input",
            Self::Store(_) => "store_unavailable",
            Self::Vector(_) => "vector_failure",
            Self::Embedding(_) => "embedding_failure",
            Self::Cancelled => "cancelled",
        }
    }
}
