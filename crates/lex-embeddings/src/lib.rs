//! # lex-embeddings
//!
//! Batch embedding client contract for lexis, plus two engines:
//!
//! - [`FastembedEngine`] — local ONNX embedding generation via fastembed,
//!   no external API keys required.
//! - [`HashEmbedder`] — deterministic hashed bag-of-characters vectors for
//!   tests and offline smoke runs (no model download).
//!
//! The contract requires order preservation (vector *i* belongs to text *i*)
//! and a per-text fallback when a whole batch fails. fastembed is synchronous
//! (the ONNX runtime parallelizes internally), so the engine drives it
//! through `tokio::task::spawn_blocking`.

mod engine;
mod error;
mod stub;

pub use engine::{FastembedEngine, FastembedOptions};
pub use error::EmbeddingError;
pub use stub::HashEmbedder;

use std::future::Future;

/// A batch-embedding client with a fixed declared dimension.
///
/// Orchestrators are generic over this trait; engines are selected by static
/// configuration, not downcasting.
pub trait Embedder: Send + Sync {
    /// Dimension of every vector this embedder produces.
    fn dim(&self) -> usize;

    /// Embed a batch of texts, order-preserving: output length equals input
    /// length and vector `i` embeds text `i`.
    fn embed_batch(
        &self,
        texts: Vec<String>,
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, EmbeddingError>> + Send;

    /// Embed a single text.
    fn embed_one(
        &self,
        text: String,
    ) -> impl Future<Output = Result<Vec<f32>, EmbeddingError>> + Send {
        async {
            let mut vectors = self.embed_batch(vec![text]).await?;
            vectors.pop().ok_or(EmbeddingError::CountMismatch {
                expected: 1,
                actual: 0,
            })
        }
    }
}

/// Validate an engine's output against the contract.
pub(crate) fn check_output(
    dim: usize,
    expected_len: usize,
    vectors: &[Vec<f32>],
) -> Result<(), EmbeddingError> {
    if vectors.len() != expected_len {
        return Err(EmbeddingError::CountMismatch {
            expected: expected_len,
            actual: vectors.len(),
        });
    }
    for vector in vectors {
        if vector.len() != dim {
            return Err(EmbeddingError::DimensionMismatch {
                expected: dim,
                actual: vector.len(),
            });
        }
    }
    Ok(())
}
