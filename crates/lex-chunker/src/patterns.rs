//! Statute grammar cues and per-document strategy detection.

use regex::Regex;
use std::sync::LazyLock;

/// `## 第一章 總則` / `## 第 1 章` — chapter markers, Chinese or numeric
/// ordinals, full-width digits tolerated.
pub static CHAPTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^##\s*第\s*([一二三四五六七八九十百千0-9０-９]+)\s*章\s*(.*)$")
        .expect("hardcoded regex compiles")
});

/// `### 第 7 條` / `## 第7-1條` / `# 第 12 條之 1` — article markers with
/// tolerant spacing and inserted-article suffixes (`-1` before 條 or `之 1`
/// after it).
pub static ARTICLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^#{1,3}\s*第\s*([0-9０-９]+)\s*(?:-\s*([0-9０-９]+)\s*)?條(?:\s*之\s*([0-9０-９]+))?\s*(.*)$",
    )
    .expect("hardcoded regex compiles")
});

/// `一、` numbered paragraphs inside an article.
pub static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([一二三四五六七八九十]+)、\s*(.*)$").expect("hardcoded regex compiles")
});

/// `第 1 款` / `第 2 項` clause markers inside an article.
pub static CLAUSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^第\s*([0-9０-９]+)\s*([款項])\s*(.*)$").expect("hardcoded regex compiles")
});

/// `- item` / `* item` bullets following an article.
pub static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-*]\s+(.*)$").expect("hardcoded regex compiles"));

/// Generic markdown heading.
pub static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.*)$").expect("hardcoded regex compiles"));

/// Chunking strategy chosen per document from the cues present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStrategy {
    /// Chapter and article markers: root → chapters → articles → sections.
    ChaptersAndArticles,
    /// Article markers only: root → articles → sections.
    ArticlesOnly,
    /// Generic markdown headings: hierarchy follows `#` count.
    MarkdownHeadings,
    /// No structure: flat chunking under the document root.
    Flat,
}

impl ChunkStrategy {
    /// Pick the strategy for a document by scanning its lines once.
    #[must_use]
    pub fn detect(doc_text: &str) -> Self {
        let mut has_chapters = false;
        let mut has_articles = false;
        let mut has_headings = false;
        for line in doc_text.lines() {
            if CHAPTER_RE.is_match(line) {
                has_chapters = true;
            } else if ARTICLE_RE.is_match(line) {
                has_articles = true;
            } else if HEADING_RE.is_match(line) {
                has_headings = true;
            }
        }
        if has_chapters && has_articles {
            Self::ChaptersAndArticles
        } else if has_articles {
            Self::ArticlesOnly
        } else if has_headings {
            Self::MarkdownHeadings
        } else {
            Self::Flat
        }
    }
}

/// Map full-width digits (`０-９`) to their ASCII counterparts.
#[must_use]
pub fn normalize_digits(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '０'..='９' => char::from(b'0' + u8::try_from(u32::from(c) - u32::from('０')).unwrap_or(0)),
            _ => c,
        })
        .collect()
}

/// Normalize a matched article number into display form, e.g. `第 7 條` or
/// `第 7-1 條` for inserted articles.
#[must_use]
pub fn article_display(main: &str, suffix: Option<&str>) -> String {
    let main = normalize_digits(main.trim());
    match suffix {
        Some(sub) => format!("第 {main}-{} 條", normalize_digits(sub.trim())),
        None => format!("第 {main} 條"),
    }
}

/// Normalize a matched chapter ordinal into display form, e.g. `第一章`.
#[must_use]
pub fn chapter_display(ordinal: &str) -> String {
    format!("第{}章", normalize_digits(ordinal.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn chapter_marker_variants() {
        for line in ["## 第一章 總則", "##第二章", "## 第 3 章 罰則", "## 第１０章"] {
            assert!(CHAPTER_RE.is_match(line), "should match: {line}");
        }
        assert!(!CHAPTER_RE.is_match("### 第一章"), "chapters are `##` only");
        assert!(!CHAPTER_RE.is_match("第一章 總則"));
    }

    #[test]
    fn article_marker_variants() {
        for line in [
            "### 第 7 條",
            "### 第7條",
            "## 第 12 條 定義",
            "# 第１條",
            "### 第 7-1 條",
            "### 第 7 條之 1",
        ] {
            assert!(ARTICLE_RE.is_match(line), "should match: {line}");
        }
        assert!(!ARTICLE_RE.is_match("第 7 條內容如下"));
    }

    #[test]
    fn section_and_clause_markers() {
        assert!(SECTION_RE.is_match("一、不得為之。"));
        assert!(SECTION_RE.is_match("十、其他"));
        assert!(CLAUSE_RE.is_match("第 1 款 前項規定"));
        assert!(CLAUSE_RE.is_match("第2項"));
        assert!(BULLET_RE.is_match("- 前項所稱"));
        assert!(!SECTION_RE.is_match("其一、二者皆非開頭"));
    }

    #[test]
    fn strategy_detection() {
        let both = "## 第一章 總則\n### 第 1 條\n內容";
        assert_eq!(ChunkStrategy::detect(both), ChunkStrategy::ChaptersAndArticles);

        let articles = "### 第 1 條\n內容\n### 第 2 條\n更多";
        assert_eq!(ChunkStrategy::detect(articles), ChunkStrategy::ArticlesOnly);

        let markdown = "# Title\n## Section\nbody";
        assert_eq!(ChunkStrategy::detect(markdown), ChunkStrategy::MarkdownHeadings);

        assert_eq!(ChunkStrategy::detect("plain text only"), ChunkStrategy::Flat);
        assert_eq!(ChunkStrategy::detect(""), ChunkStrategy::Flat);
    }

    #[test]
    fn digit_normalization_and_display() {
        assert_eq!(normalize_digits("１０７"), "107");
        assert_eq!(article_display("7", None), "第 7 條");
        assert_eq!(article_display("７", Some("1")), "第 7-1 條");
        assert_eq!(chapter_display("一"), "第一章");
        assert_eq!(chapter_display("３"), "第3章");
    }
}
