//! Document entity and tree invariant validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::chunk::{Chunk, ChunkKind};
use crate::errors::CoreError;
use crate::ids::DocumentId;

/// A parsed statute: the root of one chunk tree plus document-level fields.
///
/// `chunks` is stored in depth-first pre-order; `total_chars` and
/// `chunk_count` are derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub source_file: String,
    /// All chunks in depth-first pre-order, root first.
    pub chunks: Vec<Chunk>,
    pub total_chars: usize,
    pub chunk_count: usize,
    pub law_category: Option<String>,
    pub version: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Assemble a document from its pre-ordered chunks, deriving the counts.
    #[must_use]
    pub fn new(
        id: DocumentId,
        title: String,
        source_file: String,
        chunks: Vec<Chunk>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let total_chars = chunks.iter().map(|c| c.char_count).sum();
        let chunk_count = chunks.len();
        Self {
            id,
            title,
            source_file,
            chunks,
            total_chars,
            chunk_count,
            law_category: None,
            version: None,
            created_at,
            updated_at: created_at,
        }
    }

    /// The document-root chunk.
    #[must_use]
    pub fn root(&self) -> Option<&Chunk> {
        self.chunks.first()
    }

    /// Check every tree invariant, naming the first offending chunk.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if the document is empty, has no
    /// single root, contains a chunk whose parent is missing or at the wrong
    /// depth, repeats a sibling path, desynchronizes `char_count`, or sets
    /// `article_number` on a non-article.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.chunks.is_empty() {
            return Err(CoreError::Validation(format!(
                "document '{}' has no chunks",
                self.id
            )));
        }

        let by_id: HashMap<&str, &Chunk> = self
            .chunks
            .iter()
            .map(|c| (c.id.as_str(), c))
            .collect();
        if by_id.len() != self.chunks.len() {
            return Err(CoreError::Validation(format!(
                "document '{}' repeats a chunk id",
                self.id
            )));
        }

        let roots: Vec<&Chunk> = self.chunks.iter().filter(|c| c.depth() == 0).collect();
        if roots.len() != 1 {
            return Err(CoreError::Validation(format!(
                "document '{}' has {} roots, expected exactly 1",
                self.id,
                roots.len()
            )));
        }

        let mut seen_paths = HashSet::new();
        for chunk in &self.chunks {
            if chunk.document_id != self.id {
                return Err(CoreError::Validation(format!(
                    "chunk {} belongs to '{}', not '{}'",
                    chunk.id, chunk.document_id, self.id
                )));
            }
            if !seen_paths.insert(chunk.path.to_storage()) {
                return Err(CoreError::Validation(format!(
                    "chunk {} repeats path {}",
                    chunk.id, chunk.path
                )));
            }
            if chunk.char_count != chunk.content.chars().count() {
                return Err(CoreError::Validation(format!(
                    "chunk {} char_count is out of sync",
                    chunk.id
                )));
            }
            if chunk.page_number == 0 {
                return Err(CoreError::Validation(format!(
                    "chunk {} has page_number 0",
                    chunk.id
                )));
            }
            if chunk.article_number.is_some() != (chunk.kind == ChunkKind::Article) {
                return Err(CoreError::Validation(format!(
                    "chunk {} article_number does not match kind {}",
                    chunk.id, chunk.kind
                )));
            }

            match (&chunk.parent_id, chunk.depth()) {
                (None, 0) => {}
                (None, _) => {
                    return Err(CoreError::Validation(format!(
                        "non-root chunk {} has no parent",
                        chunk.id
                    )));
                }
                (Some(_), 0) => {
                    return Err(CoreError::Validation(format!(
                        "root chunk {} has a parent",
                        chunk.id
                    )));
                }
                (Some(parent_id), depth) => {
                    let parent = by_id.get(parent_id.as_str()).ok_or_else(|| {
                        CoreError::Validation(format!(
                            "chunk {} references missing parent {parent_id}",
                            chunk.id
                        ))
                    })?;
                    if parent.depth() + 1 != depth {
                        return Err(CoreError::Validation(format!(
                            "chunk {} at depth {depth} has parent at depth {}",
                            chunk.id,
                            parent.depth()
                        )));
                    }
                    if !parent.path.is_ancestor_of(&chunk.path) {
                        return Err(CoreError::Validation(format!(
                            "chunk {} path is not under its parent {}",
                            chunk.id, parent.id
                        )));
                    }
                }
            }
        }

        if self.chunk_count != self.chunks.len() {
            return Err(CoreError::Validation(format!(
                "document '{}' chunk_count is out of sync",
                self.id
            )));
        }
        let total: usize = self.chunks.iter().map(|c| c.char_count).sum();
        if self.total_chars != total {
            return Err(CoreError::Validation(format!(
                "document '{}' total_chars is out of sync",
                self.id
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::HierarchyPath;
    use pretty_assertions::assert_eq;

    fn doc_id() -> DocumentId {
        DocumentId::parse("statute").unwrap()
    }

    fn chunk_at(labels: &[&str], kind: ChunkKind) -> Chunk {
        Chunk::new(
            doc_id(),
            format!("content of {}", labels.join("/")),
            HierarchyPath::from_labels(labels),
            kind,
            "statute.md".to_string(),
            Utc::now(),
        )
    }

    fn two_level_document() -> Document {
        let mut root = chunk_at(&[], ChunkKind::Document);
        let mut chapter = chunk_at(&["第一章"], ChunkKind::Chapter);
        chapter.parent_id = Some(root.id.clone());
        root.children_ids.push(chapter.id.clone());
        Document::new(
            doc_id(),
            "統一法".to_string(),
            "statute.md".to_string(),
            vec![root, chapter],
            Utc::now(),
        )
    }

    #[test]
    fn valid_document_passes() {
        let doc = two_level_document();
        doc.validate().unwrap();
        assert_eq!(doc.chunk_count, 2);
        assert_eq!(
            doc.total_chars,
            doc.chunks.iter().map(|c| c.char_count).sum::<usize>()
        );
    }

    #[test]
    fn empty_document_fails() {
        let doc = Document::new(
            doc_id(),
            "empty".to_string(),
            "statute.md".to_string(),
            vec![],
            Utc::now(),
        );
        assert!(doc.validate().is_err());
    }

    #[test]
    fn missing_parent_fails() {
        let mut doc = two_level_document();
        doc.chunks[1].parent_id = None;
        assert!(doc.validate().is_err());
    }

    #[test]
    fn wrong_parent_depth_fails() {
        let mut doc = two_level_document();
        let mut section = chunk_at(&["第一章", "第 7 條", "一、"], ChunkKind::Section);
        // parent is the root, two levels up
        section.parent_id = Some(doc.chunks[0].id.clone());
        doc.chunks.push(section);
        doc.chunk_count += 1;
        doc.total_chars = doc.chunks.iter().map(|c| c.char_count).sum();
        assert!(doc.validate().is_err());
    }

    #[test]
    fn duplicate_sibling_path_fails() {
        let mut doc = two_level_document();
        let dup = doc.chunks[1].clone();
        doc.chunks.push(dup);
        doc.chunk_count += 1;
        doc.total_chars = doc.chunks.iter().map(|c| c.char_count).sum();
        assert!(doc.validate().is_err());
    }

    #[test]
    fn stale_char_count_fails() {
        let mut doc = two_level_document();
        doc.chunks[1].char_count += 1;
        doc.total_chars += 1;
        assert!(doc.validate().is_err());
    }

    #[test]
    fn article_number_only_on_articles() {
        let mut doc = two_level_document();
        doc.chunks[1].article_number = Some("第 7 條".to_string());
        assert!(doc.validate().is_err(), "chapter with article_number");
    }
}
