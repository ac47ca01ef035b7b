//! # lex-core
//!
//! Core types, hierarchy paths, and identifiers for lexis.
//!
//! This crate provides the foundational types shared across all lexis crates:
//! - `Chunk` and `Document` entity structs with tree invariant validation
//! - `ChunkKind` / `IndexingLayer` enums with layer assignment rules
//! - `HierarchyPath` with ASCII-safe digest label encoding
//! - Deterministic `DocumentId` / `ChunkId` minting
//! - Cross-cutting error types

pub mod chunk;
pub mod document;
pub mod errors;
pub mod ids;
pub mod path;

pub use chunk::{Chunk, ChunkKind, IndexingLayer};
pub use document::Document;
pub use errors::CoreError;
pub use ids::{ChunkId, DocumentId};
pub use path::HierarchyPath;
