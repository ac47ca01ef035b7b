//! Result pack types and display-path reconstruction.

use lex_core::{Chunk, ChunkId, ChunkKind};
use serde::Serialize;

use crate::options::RetrievalStrategy;

/// A context chunk inside a group (ancestor or sibling).
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub chunk_id: ChunkId,
    pub path_display: String,
    pub kind: ChunkKind,
    pub content: String,
}

/// The primary match of a group.
#[derive(Debug, Clone, Serialize)]
pub struct PrimaryChunk {
    pub chunk_id: ChunkId,
    pub path_display: String,
    pub kind: ChunkKind,
    pub content: String,
    pub score: f32,
}

/// One result group: a primary match with its provenance context.
#[derive(Debug, Clone, Serialize)]
pub struct ResultGroup {
    pub primary: PrimaryChunk,
    pub ancestors: Vec<RetrievedChunk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub siblings: Option<Vec<RetrievedChunk>>,
}

/// Structured retrieval output.
#[derive(Debug, Clone, Serialize)]
pub struct ResultPack {
    pub query: String,
    pub strategy: RetrievalStrategy,
    pub groups: Vec<ResultGroup>,
    /// Characters across every content field in the pack.
    pub total_char_count: usize,
}

impl ResultPack {
    /// Recompute `total_char_count` from the assembled groups.
    pub(crate) fn sync_char_count(&mut self) {
        self.total_char_count = self
            .groups
            .iter()
            .map(|g| {
                g.primary.content.chars().count()
                    + g.ancestors
                        .iter()
                        .map(|a| a.content.chars().count())
                        .sum::<usize>()
                    + g.siblings
                        .iter()
                        .flatten()
                        .map(|s| s.content.chars().count())
                        .sum::<usize>()
            })
            .sum();
    }
}

/// Human-readable label for one chunk, from its display metadata — never
/// from the digest-encoded internal path.
#[must_use]
pub fn display_label(chunk: &Chunk) -> String {
    if let Some(article) = &chunk.article_number {
        return article.clone();
    }
    if let Some(title) = chunk.title() {
        return title.to_string();
    }
    if let Some(chapter) = &chunk.chapter_number {
        return chapter.clone();
    }
    chunk.kind.as_str().to_string()
}

/// Display path for a chunk given its ancestors, nearest first.
#[must_use]
pub fn display_path(chunk: &Chunk, ancestors_nearest_first: &[Chunk]) -> String {
    let mut labels: Vec<String> = ancestors_nearest_first
        .iter()
        .rev()
        .map(display_label)
        .collect();
    labels.push(display_label(chunk));
    labels.join(" > ")
}

/// Truncate content to at most `max` characters at a char boundary.
#[must_use]
pub fn truncate_content(content: &str, max: usize) -> String {
    match content.char_indices().nth(max) {
        Some((byte_idx, _)) => content[..byte_idx].to_string(),
        None => content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lex_core::{DocumentId, HierarchyPath};
    use pretty_assertions::assert_eq;

    fn chunk(kind: ChunkKind, labels: &[&str]) -> Chunk {
        Chunk::new(
            DocumentId::parse("statute").unwrap(),
            "內容".to_string(),
            HierarchyPath::from_labels(labels),
            kind,
            "statute.md".to_string(),
            Utc::now(),
        )
    }

    #[test]
    fn display_label_prefers_article_number() {
        let mut article = chunk(ChunkKind::Article, &["第一章", "第 7 條"]);
        article.article_number = Some("第 7 條".to_string());
        article.chapter_number = Some("第一章".to_string());
        assert_eq!(display_label(&article), "第 7 條");
    }

    #[test]
    fn display_path_reads_root_to_leaf() {
        let mut root = chunk(ChunkKind::Document, &[]);
        root.metadata.insert(
            "title".to_string(),
            serde_json::Value::String("陸海空軍懲罰法".to_string()),
        );
        let mut chapter = chunk(ChunkKind::Chapter, &["第二章"]);
        chapter.chapter_number = Some("第二章".to_string());
        let mut article = chunk(ChunkKind::Article, &["第二章", "第 7 條"]);
        article.article_number = Some("第 7 條".to_string());

        // Ancestors arrive nearest first.
        let path = display_path(&article, &[chapter, root]);
        assert_eq!(path, "陸海空軍懲罰法 > 第二章 > 第 7 條");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_content("懲罰之種類", 3), "懲罰之");
        assert_eq!(truncate_content("short", 100), "short");
    }
}
