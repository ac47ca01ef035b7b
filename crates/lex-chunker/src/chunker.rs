//! Structural parse of normalized statute markdown into a chunk tree.

use chrono::Utc;
use lex_core::{ChunkKind, Document, DocumentId};
use tracing::warn;

use crate::patterns::{
    ARTICLE_RE, BULLET_RE, CHAPTER_RE, CLAUSE_RE, ChunkStrategy, HEADING_RE, SECTION_RE,
    article_display, chapter_display, normalize_digits,
};
use crate::tree::{Node, emit_tree};

/// Chunking policy knobs. `max_chunk_chars` is policy, not contract: leaves
/// longer than it are split into ordered detail parts.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Character cap for leaf chunk content.
    pub max_chunk_chars: usize,
    /// Character cap for computed summaries on inner nodes.
    pub summary_max_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: 800,
            summary_max_chars: 240,
        }
    }
}

/// Deterministic statute chunker.
///
/// `chunk` is infallible: whatever the input looks like, it produces a
/// [`Document`] satisfying every tree invariant, with the same chunk ids on
/// every invocation over the same input.
#[derive(Debug, Default, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    #[must_use]
    pub const fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Parse `doc_text` into a chunk tree for `document_id`.
    #[must_use]
    pub fn chunk(&self, doc_text: &str, file_path: &str, document_id: DocumentId) -> Document {
        let now = Utc::now();
        let strategy = ChunkStrategy::detect(doc_text);
        let title = extract_title(doc_text, &document_id);

        let root = match strategy {
            ChunkStrategy::ChaptersAndArticles => parse_statute(doc_text, &title, true),
            ChunkStrategy::ArticlesOnly => parse_statute(doc_text, &title, false),
            ChunkStrategy::MarkdownHeadings => parse_markdown(doc_text, &title),
            ChunkStrategy::Flat => {
                if !doc_text.trim().is_empty() {
                    warn!(document_id = %document_id, "unstructured document, flat chunking");
                }
                parse_flat(doc_text, &title)
            }
        };

        let chunks = emit_tree(&root, &document_id, file_path, &self.config, now);
        Document::new(document_id, title, file_path.to_string(), chunks, now)
    }
}

/// Document title: first H1 heading that is not itself a statute marker,
/// else the first non-empty line (clipped), else the id.
fn extract_title(doc_text: &str, document_id: &DocumentId) -> String {
    for line in doc_text.lines() {
        if CHAPTER_RE.is_match(line) || ARTICLE_RE.is_match(line) {
            continue;
        }
        if let Some(caps) = HEADING_RE.captures(line) {
            if caps[1].len() == 1 {
                return caps[2].trim().to_string();
            }
        }
    }
    doc_text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map_or_else(
            || document_id.to_string(),
            |l| l.trim_start_matches('#').trim().chars().take(120).collect(),
        )
}

/// Whether a line is the document's own H1 title heading.
fn is_title_line(line: &str, title: &str) -> bool {
    HEADING_RE
        .captures(line)
        .is_some_and(|caps| caps[1].len() == 1 && caps[2].trim() == title)
}

/// Per-line page assignment: pages advance on form-feed characters left in
/// the normalized markdown by the format converter.
fn page_of_line(pages: &[u32], idx: usize) -> u32 {
    pages.get(idx).copied().unwrap_or(1)
}

fn line_pages(doc_text: &str) -> Vec<u32> {
    let mut pages = Vec::new();
    let mut page = 1_u32;
    for line in doc_text.lines() {
        pages.push(page);
        page += u32::try_from(line.matches('\u{c}').count()).unwrap_or(0);
    }
    pages
}

/// Parse a statute with article markers, optionally grouped under chapters.
///
/// Tree shape: root → chapters (if present) → articles → sections. Articles
/// appearing before the first chapter attach directly to the root.
fn parse_statute(doc_text: &str, title: &str, with_chapters: bool) -> Node {
    let pages = line_pages(doc_text);
    let mut root = Node::new("", ChunkKind::Document);
    root.title = Some(title.to_string());

    let mut chapter: Option<Node> = None;
    let mut article: Option<Node> = None;
    let mut section: Option<Node> = None;
    let mut bullet_counter = 0_usize;

    for (idx, line) in doc_text.lines().enumerate() {
        let page = page_of_line(&pages, idx);

        if chapter.is_none() && article.is_none() && is_title_line(line, title) {
            continue;
        }

        if with_chapters {
            if let Some(caps) = CHAPTER_RE.captures(line) {
                flush_section(&mut section, &mut article);
                flush_article(&mut article, &mut chapter, &mut root);
                flush_chapter(&mut chapter, &mut root);
                bullet_counter = 0;

                let heading = line.trim_start_matches('#').trim().to_string();
                let mut node = Node::new(heading.clone(), ChunkKind::Chapter);
                node.title = Some(heading);
                node.chapter_number = Some(chapter_display(&caps[1]));
                node.page = page;
                chapter = Some(node);
                continue;
            }
        }

        if let Some(caps) = ARTICLE_RE.captures(line) {
            flush_section(&mut section, &mut article);
            flush_article(&mut article, &mut chapter, &mut root);
            bullet_counter = 0;

            let suffix = caps.get(2).or_else(|| caps.get(3));
            let number = article_display(&caps[1], suffix.map(|m| m.as_str()));
            let rest = caps[4].trim();
            let heading = if rest.is_empty() {
                number.clone()
            } else {
                format!("{number} {rest}")
            };
            let mut node = Node::new(number.clone(), ChunkKind::Article);
            node.title = Some(heading);
            node.article_number = Some(number);
            node.page = page;
            article = Some(node);
            continue;
        }

        // Section cues only make sense inside an article.
        if article.is_some() {
            let section_label = if let Some(caps) = SECTION_RE.captures(line) {
                Some(format!("{}、", &caps[1]))
            } else if let Some(caps) = CLAUSE_RE.captures(line) {
                Some(format!("第{}{}", normalize_digits(&caps[1]), &caps[2]))
            } else if BULLET_RE.is_match(line) {
                bullet_counter += 1;
                Some(format!("item_{bullet_counter}"))
            } else {
                None
            };

            if let Some(label) = section_label {
                flush_section(&mut section, &mut article);
                let mut node = Node::new(label, ChunkKind::Section);
                node.body.push(line.trim().to_string());
                node.page = page;
                section = Some(node);
                continue;
            }
        }

        let target = section
            .as_mut()
            .or(article.as_mut())
            .or(chapter.as_mut())
            .unwrap_or(&mut root);
        push_body_line(target, line);
    }

    flush_section(&mut section, &mut article);
    flush_article(&mut article, &mut chapter, &mut root);
    flush_chapter(&mut chapter, &mut root);
    root
}

fn flush_section(section: &mut Option<Node>, article: &mut Option<Node>) {
    if let Some(node) = section.take() {
        if let Some(parent) = article.as_mut() {
            parent.children.push(node);
        }
    }
}

fn flush_article(article: &mut Option<Node>, chapter: &mut Option<Node>, root: &mut Node) {
    if let Some(node) = article.take() {
        match chapter.as_mut() {
            Some(parent) => parent.children.push(node),
            None => root.children.push(node),
        }
    }
}

fn flush_chapter(chapter: &mut Option<Node>, root: &mut Node) {
    if let Some(node) = chapter.take() {
        root.children.push(node);
    }
}

/// Parse generic markdown: hierarchy follows `#` count. Depth-1 nodes act as
/// thematic anchors (chapter kind, summary layer); deeper headings are
/// sections.
fn parse_markdown(doc_text: &str, title: &str) -> Node {
    let pages = line_pages(doc_text);
    let mut root = Node::new("", ChunkKind::Document);
    root.title = Some(title.to_string());

    // Stack of (heading level, node) for open headings.
    let mut stack: Vec<(usize, Node)> = Vec::new();
    let mut saw_title_h1 = false;

    for (idx, line) in doc_text.lines().enumerate() {
        if let Some(caps) = HEADING_RE.captures(line) {
            let level = caps[1].len();
            let text = caps[2].trim().to_string();

            // The first H1 is the document title, not a child node.
            if level == 1 && !saw_title_h1 && stack.is_empty() && text == title {
                saw_title_h1 = true;
                continue;
            }

            while stack.last().is_some_and(|(l, _)| *l >= level) {
                pop_into_parent(&mut stack, &mut root);
            }
            let kind = if stack.is_empty() {
                ChunkKind::Chapter
            } else {
                ChunkKind::Section
            };
            let mut node = Node::new(text.clone(), kind);
            node.title = Some(text);
            node.page = page_of_line(&pages, idx);
            stack.push((level, node));
            continue;
        }

        match stack.last_mut() {
            Some((_, node)) => push_body_line(node, line),
            None => push_body_line(&mut root, line),
        }
    }

    while !stack.is_empty() {
        pop_into_parent(&mut stack, &mut root);
    }
    root
}

fn pop_into_parent(stack: &mut Vec<(usize, Node)>, root: &mut Node) {
    if let Some((_, node)) = stack.pop() {
        match stack.last_mut() {
            Some((_, parent)) => parent.children.push(node),
            None => root.children.push(node),
        }
    }
}

/// No structure at all: the whole text lives on the root. The root carries
/// no title line so its content equals the document text.
fn parse_flat(doc_text: &str, _title: &str) -> Node {
    let mut root = Node::new("", ChunkKind::Document);
    root.body = doc_text.lines().map(str::to_string).collect();
    root
}

fn push_body_line(node: &mut Node, line: &str) {
    let trimmed = line.trim_end();
    if trimmed.trim().is_empty() {
        // Preserve paragraph breaks, but never lead with blanks.
        if !node.body.is_empty() {
            node.body.push(String::new());
        }
    } else {
        node.body.push(trimmed.to_string());
    }
}
