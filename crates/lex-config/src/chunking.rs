//! Chunking policy configuration.

use serde::{Deserialize, Serialize};

const fn default_max_chunk_chars() -> usize {
    800
}

const fn default_summary_max_chars() -> usize {
    240
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChunkingConfig {
    /// Character cap for leaf chunk content before splitting.
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    /// Character cap for computed summaries on inner nodes.
    #[serde(default = "default_summary_max_chars")]
    pub summary_max_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: default_max_chunk_chars(),
            summary_max_chars: default_summary_max_chars(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = ChunkingConfig::default();
        assert_eq!(config.max_chunk_chars, 800);
        assert_eq!(config.summary_max_chars, 240);
    }
}
