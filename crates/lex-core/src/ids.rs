//! Deterministic document and chunk identifiers.
//!
//! Both identifier kinds are derived, never random: the same source file and
//! the same tree position always mint the same ids, which is what makes
//! re-indexing idempotent and lets embeddings be keyed by chunk identity.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

use crate::errors::CoreError;
use crate::path::{HierarchyPath, encode_label};

/// Prefix for chunk identifiers.
pub const PREFIX_CHUNK: &str = "chk_";

/// Maximum length of a document identifier.
pub const MAX_DOCUMENT_ID_LEN: usize = 63;

/// Stable identifier for a document, derived from its source filename.
///
/// Always an ASCII token over `[a-z0-9_]`, at most 63 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Derive a document id from a source filename.
    ///
    /// Strips the extension, encodes the stem the same way path labels are
    /// encoded (non-ASCII stems become digest tokens), and truncates to
    /// [`MAX_DOCUMENT_ID_LEN`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidId`] if the filename has no usable stem.
    pub fn from_filename(name: &str) -> Result<Self, CoreError> {
        let stem = Path::new(name)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CoreError::InvalidId(format!("no file stem in '{name}'")))?;
        let mut encoded = encode_label(stem);
        encoded.truncate(MAX_DOCUMENT_ID_LEN);
        Ok(Self(encoded))
    }

    /// Wrap an identifier read back from storage.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidId`] if the token violates the id alphabet
    /// or length bound.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let valid = !s.is_empty()
            && s.len() <= MAX_DOCUMENT_ID_LEN
            && s.chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(CoreError::InvalidId(format!("invalid document id '{s}'")))
        }
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Globally unique identifier for a node in a document tree.
///
/// Derived from `(document_id, path)`, so a chunk keeps its id across
/// re-indexings as long as its position is stable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(String);

impl ChunkId {
    /// Mint the id for the chunk at `path` inside `document_id`.
    #[must_use]
    pub fn derive(document_id: &DocumentId, path: &HierarchyPath) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(document_id.as_str().as_bytes());
        hasher.update([0]);
        hasher.update(path.to_storage().as_bytes());
        let digest = hasher.finalize();
        let mut hex = String::with_capacity(16);
        for byte in &digest[..8] {
            use fmt::Write;
            let _ = write!(hex, "{byte:02x}");
        }
        Self(format!("{PREFIX_CHUNK}{hex}"))
    }

    /// Wrap an identifier read back from storage.
    #[must_use]
    pub fn from_raw(s: String) -> Self {
        Self(s)
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn document_id_strips_extension_and_lowercases() {
        let id = DocumentId::from_filename("Civil-Code.md").unwrap();
        assert_eq!(id.as_str(), "civil_code");
    }

    #[test]
    fn document_id_from_non_ascii_filename() {
        let id = DocumentId::from_filename("陸海空軍懲罰法.md").unwrap();
        assert!(id.as_str().starts_with("seg_"));
        assert!(id.as_str().len() <= MAX_DOCUMENT_ID_LEN);

        let again = DocumentId::from_filename("陸海空軍懲罰法.md").unwrap();
        assert_eq!(id, again);
    }

    #[test]
    fn document_id_respects_length_bound() {
        let long = format!("{}.md", "a".repeat(200));
        let id = DocumentId::from_filename(&long).unwrap();
        assert_eq!(id.as_str().len(), MAX_DOCUMENT_ID_LEN);
    }

    #[test]
    fn document_id_rejects_empty_stem() {
        assert!(DocumentId::from_filename("").is_err());
        assert!(DocumentId::from_filename(".md").is_err());
    }

    #[test]
    fn parse_round_trips_valid_ids() {
        let id = DocumentId::parse("civil_code").unwrap();
        assert_eq!(id.as_str(), "civil_code");
        assert!(DocumentId::parse("Civil Code").is_err());
        assert!(DocumentId::parse("").is_err());
    }

    #[test]
    fn chunk_id_is_stable_and_prefixed() {
        let doc = DocumentId::from_filename("statute.md").unwrap();
        let path = HierarchyPath::from_labels(&["第一章", "第 7 條"]);

        let a = ChunkId::derive(&doc, &path);
        let b = ChunkId::derive(&doc, &path);
        assert_eq!(a, b);
        assert!(a.as_str().starts_with(PREFIX_CHUNK));
        assert_eq!(a.as_str().len(), PREFIX_CHUNK.len() + 16);
    }

    #[test]
    fn chunk_id_varies_with_path_and_document() {
        let doc = DocumentId::from_filename("statute.md").unwrap();
        let other_doc = DocumentId::from_filename("other.md").unwrap();
        let path = HierarchyPath::from_labels(&["第一章"]);
        let other_path = HierarchyPath::from_labels(&["第二章"]);

        let base = ChunkId::derive(&doc, &path);
        assert_ne!(base, ChunkId::derive(&doc, &other_path));
        assert_ne!(base, ChunkId::derive(&other_doc, &path));
    }
}
