//! Local fastembed engine.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use fastembed::{EmbeddingModel, TextEmbedding, TextInitOptions};
use tracing::warn;

use crate::error::EmbeddingError;
use crate::{Embedder, check_output};

/// Options for the fastembed engine.
#[derive(Debug, Clone)]
pub struct FastembedOptions {
    /// Model cache directory. Defaults to `~/.lexis/cache/fastembed/` so
    /// models persist across builds and stay out of the repository tree.
    pub cache_dir: Option<PathBuf>,
    /// Show a download progress bar on first run.
    pub show_download_progress: bool,
}

impl Default for FastembedOptions {
    fn default() -> Self {
        Self {
            cache_dir: None,
            show_download_progress: true,
        }
    }
}

/// Default cache directory for model files.
fn default_cache_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".lexis")
        .join("cache")
        .join("fastembed")
}

/// Batch-capable local embedding engine backed by fastembed (ONNX runtime).
///
/// Uses `AllMiniLML6V2` (384-dim, mean pooling, no query/passage prefixes).
/// `TextEmbedding::embed` takes `&mut self`, so the model sits behind a
/// mutex and every call runs on the blocking thread pool.
pub struct FastembedEngine {
    model: Arc<Mutex<TextEmbedding>>,
    dim: usize,
}

impl std::fmt::Debug for FastembedEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastembedEngine").field("dim", &self.dim).finish()
    }
}

impl FastembedEngine {
    /// Load (downloading on first run) the embedding model.
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError::InitFailed`] if the model cannot be loaded.
    pub fn new(options: &FastembedOptions) -> Result<Self, EmbeddingError> {
        let model_kind = EmbeddingModel::AllMiniLML6V2;
        let dim = TextEmbedding::get_model_info(&model_kind)
            .map_err(|e| EmbeddingError::InitFailed(e.to_string()))?
            .dim;
        let cache_dir = options.cache_dir.clone().unwrap_or_else(default_cache_dir);
        let init = TextInitOptions::new(model_kind)
            .with_cache_dir(cache_dir)
            .with_show_download_progress(options.show_download_progress);
        let model =
            TextEmbedding::try_new(init).map_err(|e| EmbeddingError::InitFailed(e.to_string()))?;
        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            dim,
        })
    }

    /// Run one embed call on the blocking pool.
    async fn embed_blocking(
        model: Arc<Mutex<TextEmbedding>>,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        tokio::task::spawn_blocking(move || {
            let mut guard = model
                .lock()
                .map_err(|_| EmbeddingError::EmbedFailed("model mutex poisoned".to_string()))?;
            guard
                .embed(texts, None)
                .map_err(|e| EmbeddingError::EmbedFailed(e.to_string()))
        })
        .await
        .map_err(|e| EmbeddingError::EmbedFailed(format!("blocking task failed: {e}")))?
    }
}

impl Embedder for FastembedEngine {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let expected = texts.len();

        match Self::embed_blocking(Arc::clone(&self.model), texts.clone()).await {
            Ok(vectors) => {
                check_output(self.dim, expected, &vectors)?;
                Ok(vectors)
            }
            Err(batch_error) => {
                // Whole-batch failure: fall back to one text at a time so a
                // single poisonous input cannot sink its batchmates.
                warn!(error = %batch_error, batch = expected, "batch embed failed, falling back per-text");
                let mut vectors = Vec::with_capacity(expected);
                for text in texts {
                    let mut single =
                        Self::embed_blocking(Arc::clone(&self.model), vec![text]).await?;
                    vectors.push(single.pop().ok_or(EmbeddingError::CountMismatch {
                        expected: 1,
                        actual: 0,
                    })?);
                }
                check_output(self.dim, expected, &vectors)?;
                Ok(vectors)
            }
        }
    }
}
