//! Retrieval options and their validation ranges.

use lex_core::DocumentId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use crate::error::RetrieveError;

/// Bounds for `top_k`.
pub const TOP_K_RANGE: std::ops::RangeInclusive<usize> = 1..=50;
/// Bounds for `content_max_length`.
pub const CONTENT_MAX_LENGTH_RANGE: std::ops::RangeInclusive<usize> = 100..=2000;

/// Which retrieval strategy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalStrategy {
    /// Rank coarse nodes first, then expand into their descendants.
    SummaryFirst,
    /// Search the detail layer directly.
    Direct,
}

impl RetrievalStrategy {
    /// Return the string representation used in serialized packs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SummaryFirst => "summary_first",
            Self::Direct => "direct",
        }
    }
}

impl fmt::Display for RetrievalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recognized retrieval options.
#[derive(Debug, Clone)]
pub struct RetrieveOptions {
    pub strategy: RetrievalStrategy,
    /// Restrict search to these documents. An empty set matches nothing.
    pub document_filter: Option<Vec<DocumentId>>,
    /// Final number of result groups (1–50).
    pub top_k: usize,
    /// Phase-1 breadth for summary-first. Zero degrades to direct.
    pub summary_k: usize,
    /// Phase-2 depth per summary hit.
    pub details_per_summary: usize,
    /// Per-chunk character cap for returned content (100–2000).
    pub content_max_length: usize,
    pub include_ancestors: bool,
    pub include_siblings: bool,
    /// Deadline; partial results are returned if any group completed.
    pub deadline: Option<Instant>,
}

impl Default for RetrieveOptions {
    fn default() -> Self {
        Self {
            strategy: RetrievalStrategy::SummaryFirst,
            document_filter: None,
            top_k: 5,
            summary_k: 3,
            details_per_summary: 3,
            content_max_length: 800,
            include_ancestors: true,
            include_siblings: false,
            deadline: None,
        }
    }
}

impl RetrieveOptions {
    /// Check every option against its documented range.
    ///
    /// # Errors
    ///
    /// Returns [`RetrieveError::InvalidOptions`] naming the offending field.
    pub fn validate(&self) -> Result<(), RetrieveError> {
        if !TOP_K_RANGE.contains(&self.top_k) {
            return Err(RetrieveError::InvalidOptions(format!(
                "top_k must be in {}..={}, got {}",
                TOP_K_RANGE.start(),
                TOP_K_RANGE.end(),
                self.top_k
            )));
        }
        if !CONTENT_MAX_LENGTH_RANGE.contains(&self.content_max_length) {
            return Err(RetrieveError::InvalidOptions(format!(
                "content_max_length must be in {}..={}, got {}",
                CONTENT_MAX_LENGTH_RANGE.start(),
                CONTENT_MAX_LENGTH_RANGE.end(),
                self.content_max_length
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let opts = RetrieveOptions::default();
        opts.validate().unwrap();
        assert_eq!(opts.strategy, RetrievalStrategy::SummaryFirst);
        assert_eq!(opts.top_k, 5);
        assert_eq!(opts.summary_k, 3);
        assert_eq!(opts.details_per_summary, 3);
        assert_eq!(opts.content_max_length, 800);
        assert!(opts.include_ancestors);
        assert!(!opts.include_siblings);
    }

    #[test]
    fn out_of_range_options_are_rejected() {
        for top_k in [0, 51] {
            let opts = RetrieveOptions {
                top_k,
                ..RetrieveOptions::default()
            };
            assert!(matches!(opts.validate(), Err(RetrieveError::InvalidOptions(_))));
        }
        for content_max_length in [99, 2001] {
            let opts = RetrieveOptions {
                content_max_length,
                ..RetrieveOptions::default()
            };
            assert!(matches!(opts.validate(), Err(RetrieveError::InvalidOptions(_))));
        }
    }
}
