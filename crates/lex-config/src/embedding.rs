//! Embedding client configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const fn default_dim() -> usize {
    384
}

const fn default_batch_size() -> usize {
    32
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// System-wide vector dimension; every store and engine must agree.
    #[serde(default = "default_dim")]
    pub dim: usize,

    /// Texts per embedding batch during indexing.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Model cache directory override.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dim: default_dim(),
            batch_size: default_batch_size(),
            cache_dir: None,
        }
    }
}
