//! Embedding error types.

/// Errors that can occur during embedding generation.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    /// Model initialization failed (download, ONNX runtime, cache issues).
    #[error("Model initialization failed: {0}")]
    InitFailed(String),

    /// Embedding generation failed after the per-text fallback.
    #[error("Embedding generation failed: {0}")]
    EmbedFailed(String),

    /// Model returned the wrong number of vectors for a batch.
    #[error("Expected {expected} embeddings, model returned {actual}")]
    CountMismatch { expected: usize, actual: usize },

    /// A returned vector does not have the declared dimension.
    #[error("Expected {expected}-dim embedding, model returned {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}
