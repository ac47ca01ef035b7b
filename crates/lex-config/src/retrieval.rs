//! Retrieval default configuration.

use serde::{Deserialize, Serialize};

const fn default_top_k() -> usize {
    5
}

const fn default_summary_k() -> usize {
    3
}

const fn default_details_per_summary() -> usize {
    3
}

const fn default_content_max_length() -> usize {
    800
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Final number of result groups.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Phase-1 breadth for summary-first retrieval.
    #[serde(default = "default_summary_k")]
    pub summary_k: usize,

    /// Phase-2 depth per summary hit.
    #[serde(default = "default_details_per_summary")]
    pub details_per_summary: usize,

    /// Per-chunk character cap for returned content.
    #[serde(default = "default_content_max_length")]
    pub content_max_length: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            summary_k: default_summary_k(),
            details_per_summary: default_details_per_summary(),
            content_max_length: default_content_max_length(),
        }
    }
}
