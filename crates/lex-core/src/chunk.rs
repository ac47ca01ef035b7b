//! Chunk entity and its classification enums.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`
//! and provide `as_str()` for SQL storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{ChunkId, DocumentId};
use crate::path::HierarchyPath;

/// Metadata key holding the raw (non-encoded) path labels for display.
pub const META_RAW_LABELS: &str = "raw_labels";

/// Metadata key holding a node's raw title line.
pub const META_TITLE: &str = "title";

// ---------------------------------------------------------------------------
// ChunkKind
// ---------------------------------------------------------------------------

/// Structural role of a chunk inside a statute tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Document,
    Chapter,
    Article,
    Section,
    Detail,
}

impl ChunkKind {
    /// Return the string representation used in SQL storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Chapter => "chapter",
            Self::Article => "article",
            Self::Section => "section",
            Self::Detail => "detail",
        }
    }

    /// The indexing layer a chunk of this kind receives by default.
    ///
    /// Documents and chapters are thematic anchors (summary layer), articles
    /// are indexed in both layers, and sections/details carry body text
    /// (detail layer).
    #[must_use]
    pub const fn default_layer(self) -> IndexingLayer {
        match self {
            Self::Document | Self::Chapter => IndexingLayer::Summary,
            Self::Article => IndexingLayer::Both,
            Self::Section | Self::Detail => IndexingLayer::Detail,
        }
    }
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// IndexingLayer
// ---------------------------------------------------------------------------

/// Which vector table(s) a chunk is embedded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexingLayer {
    Summary,
    Detail,
    Both,
}

impl IndexingLayer {
    /// Return the string representation used in SQL storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Detail => "detail",
            Self::Both => "both",
        }
    }

    /// Whether a chunk with this layer contributes a summary-table row.
    #[must_use]
    pub const fn includes_summary(self) -> bool {
        matches!(self, Self::Summary | Self::Both)
    }

    /// Whether a chunk with this layer contributes a detail-table row.
    #[must_use]
    pub const fn includes_detail(self) -> bool {
        matches!(self, Self::Detail | Self::Both)
    }
}

impl fmt::Display for IndexingLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Chunk
// ---------------------------------------------------------------------------

/// A node in a document's hierarchical tree; the unit of indexing and
/// retrieval.
///
/// Relations are carried as ids (`parent_id`, `children_ids`) rather than
/// references, so trees are arena-shaped and own no cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub document_id: DocumentId,
    /// Full text for leaves; title plus computed summary for inner nodes.
    pub content: String,
    pub path: HierarchyPath,
    pub kind: ChunkKind,
    pub indexing_layer: IndexingLayer,
    /// `None` exactly for the document root.
    pub parent_id: Option<ChunkId>,
    /// Direct children in source order.
    pub children_ids: Vec<ChunkId>,
    pub source_file: String,
    /// 1-based page of the source the chunk starts on.
    pub page_number: u32,
    /// Character count of `content` (chars, not bytes — content is CJK).
    pub char_count: usize,
    /// Set iff `kind == Article`, e.g. `"第 7 條"`.
    pub article_number: Option<String>,
    /// Set on chapters and propagated to descendants as read-only metadata.
    pub chapter_number: Option<String>,
    /// Free-form metadata; holds the raw path labels for display.
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Chunk {
    /// Create a chunk at `path`, minting its deterministic id and syncing
    /// `char_count` with `content`.
    #[must_use]
    pub fn new(
        document_id: DocumentId,
        content: String,
        path: HierarchyPath,
        kind: ChunkKind,
        source_file: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        let id = ChunkId::derive(&document_id, &path);
        let char_count = content.chars().count();
        Self {
            id,
            document_id,
            content,
            path,
            kind,
            indexing_layer: kind.default_layer(),
            parent_id: None,
            children_ids: Vec::new(),
            source_file,
            page_number: 1,
            char_count,
            article_number: None,
            chapter_number: None,
            metadata: serde_json::Map::new(),
            created_at,
        }
    }

    /// Depth of this chunk, equal to its path depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.path.depth()
    }

    /// Replace `content` and re-sync `char_count`.
    pub fn set_content(&mut self, content: String) {
        self.char_count = content.chars().count();
        self.content = content;
    }

    /// The raw title line recorded by the chunker, if any.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.metadata.get(META_TITLE).and_then(|v| v.as_str())
    }
}
