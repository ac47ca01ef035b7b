//! Intermediate parse tree and chunk emission.
//!
//! The parser builds a lightweight [`Node`] tree first; emission then walks
//! it depth-first, computing summaries, splitting oversized leaves, minting
//! ids, and wiring parent/child relations.

use chrono::{DateTime, Utc};
use lex_core::chunk::{META_RAW_LABELS, META_TITLE};
use lex_core::{Chunk, ChunkKind, DocumentId, HierarchyPath};
use std::collections::HashSet;

use crate::chunker::ChunkerConfig;

/// One structural node recognized by the parser.
#[derive(Debug)]
pub(crate) struct Node {
    /// Raw (possibly non-ASCII) path label below the parent. Unused on the
    /// root, which sits at the sentinel path.
    pub raw_label: String,
    /// Display title line, e.g. `第 7 條 懲罰種類`.
    pub title: Option<String>,
    pub kind: ChunkKind,
    pub chapter_number: Option<String>,
    pub article_number: Option<String>,
    /// Body lines belonging to this node itself (not to any child).
    pub body: Vec<String>,
    /// 1-based source page the node starts on.
    pub page: u32,
    pub children: Vec<Node>,
}

impl Node {
    pub(crate) fn new(raw_label: impl Into<String>, kind: ChunkKind) -> Self {
        Self {
            raw_label: raw_label.into(),
            title: None,
            kind,
            chapter_number: None,
            article_number: None,
            body: Vec::new(),
            page: 1,
            children: Vec::new(),
        }
    }

    /// Own body text, trimmed, blank-line paragraph structure preserved.
    fn body_text(&self) -> String {
        self.body.join("\n").trim().to_string()
    }

    /// First paragraph found in this subtree, pre-order.
    fn first_paragraph(&self) -> Option<String> {
        let own = self.body_text();
        if let Some(paragraph) = own.split("\n\n").map(str::trim).find(|p| !p.is_empty()) {
            return Some(paragraph.replace('\n', " "));
        }
        self.children.iter().find_map(Node::first_paragraph)
    }
}

/// Emit the chunk list for a parsed tree, pre-ordered, relations wired.
pub(crate) fn emit_tree(
    root: &Node,
    document_id: &DocumentId,
    source_file: &str,
    config: &ChunkerConfig,
    now: DateTime<Utc>,
) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let ctx = EmitContext {
        document_id,
        source_file,
        config,
        now,
    };
    emit_node(&ctx, root, HierarchyPath::root(), &[], None, None, &mut chunks);
    chunks
}

struct EmitContext<'a> {
    document_id: &'a DocumentId,
    source_file: &'a str,
    config: &'a ChunkerConfig,
    now: DateTime<Utc>,
}

/// Emit one node (and recursively its children) at `path`. Returns the index
/// of the node's chunk in `chunks`.
fn emit_node(
    ctx: &EmitContext<'_>,
    node: &Node,
    path: HierarchyPath,
    raw_labels: &[String],
    parent_index: Option<usize>,
    inherited_chapter: Option<&str>,
    chunks: &mut Vec<Chunk>,
) -> usize {
    let chapter_number = node
        .chapter_number
        .as_deref()
        .or(inherited_chapter)
        .map(str::to_string);

    let body = node.body_text();
    let is_leaf = node.children.is_empty();
    let full_content = leaf_content(node, &body);
    let needs_split = is_leaf && full_content.chars().count() > ctx.config.max_chunk_chars;

    let content = if is_leaf && !needs_split {
        full_content.clone()
    } else {
        summary_content(node, ctx.config.summary_max_chars)
    };

    let mut chunk = Chunk::new(
        ctx.document_id.clone(),
        content,
        path.clone(),
        node.kind,
        ctx.source_file.to_string(),
        ctx.now,
    );
    chunk.page_number = node.page;
    chunk.article_number = node.article_number.clone();
    chunk.chapter_number = chapter_number.clone();
    chunk.metadata.insert(
        META_RAW_LABELS.to_string(),
        serde_json::Value::Array(
            raw_labels
                .iter()
                .map(|l| serde_json::Value::String(l.clone()))
                .collect(),
        ),
    );
    if let Some(title) = &node.title {
        chunk
            .metadata
            .insert(META_TITLE.to_string(), serde_json::Value::String(title.clone()));
    }
    chunk.parent_id = parent_index.map(|i| chunks[i].id.clone());

    let index = chunks.len();
    chunks.push(chunk);
    if let Some(parent) = parent_index {
        let id = chunks[index].id.clone();
        chunks[parent].children_ids.push(id);
    }

    let mut used_labels: HashSet<String> = HashSet::new();

    if needs_split {
        for (i, part) in split_text(&full_content, ctx.config.max_chunk_chars)
            .into_iter()
            .enumerate()
        {
            let raw = format!("part_{}", i + 1);
            let child_path = unique_child_path(&path, &raw, &mut used_labels);
            let mut labels = raw_labels.to_vec();
            labels.push(raw);

            let mut part_chunk = Chunk::new(
                ctx.document_id.clone(),
                part,
                child_path,
                ChunkKind::Detail,
                ctx.source_file.to_string(),
                ctx.now,
            );
            part_chunk.page_number = node.page;
            part_chunk.chapter_number = chapter_number.clone();
            part_chunk.metadata.insert(
                META_RAW_LABELS.to_string(),
                serde_json::Value::Array(
                    labels
                        .iter()
                        .map(|l| serde_json::Value::String(l.clone()))
                        .collect(),
                ),
            );
            part_chunk.parent_id = Some(chunks[index].id.clone());

            let part_id = part_chunk.id.clone();
            chunks.push(part_chunk);
            chunks[index].children_ids.push(part_id);
        }
        return index;
    }

    // Short inner-node body is fully visible in the summary; longer body
    // becomes a leading preamble child so no source text is lost.
    if !is_leaf && body.chars().count() > ctx.config.summary_max_chars {
        let preamble = preamble_node(node, &body);
        let child_path = unique_child_path(&path, &preamble.raw_label, &mut used_labels);
        let mut labels = raw_labels.to_vec();
        labels.push(preamble.raw_label.clone());
        emit_node(
            ctx,
            &preamble,
            child_path,
            &labels,
            Some(index),
            chapter_number.as_deref(),
            chunks,
        );
    }

    for child in &node.children {
        let raw = child.raw_label.clone();
        let child_path = unique_child_path(&path, &raw, &mut used_labels);
        let mut labels = raw_labels.to_vec();
        labels.push(raw);
        emit_node(
            ctx,
            child,
            child_path,
            &labels,
            Some(index),
            chapter_number.as_deref(),
            chunks,
        );
    }

    index
}

/// A synthetic section carrying an inner node's own body text.
fn preamble_node(node: &Node, body: &str) -> Node {
    let mut preamble = Node::new("preamble", ChunkKind::Section);
    preamble.body = body.lines().map(str::to_string).collect();
    preamble.page = node.page;
    preamble
}

/// Full content for a leaf: title line plus body.
fn leaf_content(node: &Node, body: &str) -> String {
    match (&node.title, body.is_empty()) {
        (Some(title), false) => format!("{title}\n{body}"),
        (Some(title), true) => title.clone(),
        (None, _) => body.to_string(),
    }
}

/// Title line plus a clipped first paragraph of the subtree.
fn summary_content(node: &Node, summary_max_chars: usize) -> String {
    let summary = node
        .first_paragraph()
        .map(|p| clip_chars(&p, summary_max_chars));
    match (&node.title, summary) {
        (Some(title), Some(s)) if s.as_str() != title.as_str() => format!("{title}\n{s}"),
        (Some(title), _) => title.clone(),
        (None, Some(s)) => s,
        (None, None) => String::new(),
    }
}

/// Clip to at most `max` chars at a char boundary.
fn clip_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((byte_idx, _)) => s[..byte_idx].to_string(),
        None => s.to_string(),
    }
}

/// Split text into ordered parts of at most `max` chars, preferring
/// paragraph boundaries, hard-splitting paragraphs that exceed `max` alone.
pub(crate) fn split_text(text: &str, max: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0_usize;

    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let para_chars = paragraph.chars().count();
        if para_chars > max {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
                current_chars = 0;
            }
            let mut rest = paragraph;
            while rest.chars().count() > max {
                let split_at = rest
                    .char_indices()
                    .nth(max)
                    .map_or(rest.len(), |(idx, _)| idx);
                parts.push(rest[..split_at].to_string());
                rest = &rest[split_at..];
            }
            if !rest.is_empty() {
                current = rest.to_string();
                current_chars = rest.chars().count();
            }
            continue;
        }
        if current_chars + para_chars + 2 > max && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        if current.is_empty() {
            current = paragraph.to_string();
            current_chars = para_chars;
        } else {
            current.push_str("\n\n");
            current.push_str(paragraph);
            current_chars += para_chars + 2;
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    if parts.is_empty() {
        parts.push(String::new());
    }
    parts
}

/// Extend `path` by `raw`, disambiguating encoded-label collisions among
/// siblings with a numeric suffix.
fn unique_child_path<S: AsRef<str>>(
    path: &HierarchyPath,
    raw: S,
    used: &mut HashSet<String>,
) -> HierarchyPath {
    let raw = raw.as_ref();
    let mut candidate = path.child(raw);
    let mut n = 1;
    while let Some(last) = candidate.labels().last() {
        if used.insert(last.clone()) {
            break;
        }
        n += 1;
        candidate = path.child(&format!("{raw}_{n}"));
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn split_text_respects_paragraphs() {
        let text = "aaaa\n\nbbbb\n\ncccc";
        let parts = split_text(text, 10);
        assert_eq!(parts, vec!["aaaa\n\nbbbb".to_string(), "cccc".to_string()]);
    }

    #[test]
    fn split_text_hard_splits_long_paragraph() {
        let long = "x".repeat(25);
        let parts = split_text(&long, 10);
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|p| p.chars().count() <= 10));
        assert_eq!(parts.join(""), long);
    }

    #[test]
    fn split_text_counts_cjk_chars() {
        let text = "條".repeat(12);
        let parts = split_text(&text, 5);
        assert!(parts.iter().all(|p| p.chars().count() <= 5));
        assert_eq!(parts.concat(), text);
    }

    #[test]
    fn sibling_label_collisions_get_suffixes() {
        let root = HierarchyPath::root();
        let mut used = HashSet::new();
        let a = unique_child_path(&root, "item", &mut used);
        let b = unique_child_path(&root, "item", &mut used);
        assert_ne!(a, b);
        assert_eq!(b.labels().last().map(String::as_str), Some("item_2"));
    }
}
