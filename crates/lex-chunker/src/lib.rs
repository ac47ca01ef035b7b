//! # lex-chunker
//!
//! Deterministic hierarchical chunker for normalized statute markdown.
//!
//! Recognizes Traditional Chinese statute structure (chapters, articles,
//! sections/items) and emits a typed [`lex_core::Document`] tree with
//! summary/detail classification. Falls back to markdown-heading or flat
//! chunking when statute cues are absent. Never fails: structureless input
//! yields a single-root document and an `unstructured` warning.

mod chunker;
mod patterns;
mod tree;

pub use chunker::{Chunker, ChunkerConfig};
pub use patterns::ChunkStrategy;
