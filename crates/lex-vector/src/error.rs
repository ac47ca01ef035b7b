//! Vector store error types.

use lex_core::IndexingLayer;
use thiserror::Error;

/// Errors from embedding persistence and search.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    /// A vector's dimensionality disagrees with the configured value.
    #[error("Vector has {actual} dimensions, store is configured for {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The layer does not name a single embedding table.
    #[error("Layer '{0}' does not name an embedding table; partition 'both' first")]
    InvalidLayer(IndexingLayer),

    /// A stored vector blob could not be decoded.
    #[error("Corrupt vector for chunk {chunk_id}: {reason}")]
    Corrupt { chunk_id: String, reason: String },

    /// Underlying database failure.
    #[error(transparent)]
    Database(#[from] lex_db::DatabaseError),
}
