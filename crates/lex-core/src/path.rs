//! Hierarchy paths with ASCII-safe label encoding.
//!
//! A [`HierarchyPath`] encodes a chunk's position from the document root as an
//! ordered label sequence. The first label is always the sentinel `root`.
//! Paths double as storage keys, and many path indexers constrain labels to
//! ASCII, so non-ASCII segments (statute titles, chapter names) are replaced
//! with a deterministic digest token. The replacement is lossy for display —
//! display paths are rebuilt from chunk metadata, never decoded from here.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::errors::CoreError;

/// Sentinel label carried by every path at position zero.
pub const ROOT_LABEL: &str = "root";

/// Prefix for digest-substituted non-ASCII labels.
const SEGMENT_PREFIX: &str = "seg_";

/// Separator used in the storage form.
const SEPARATOR: char = '/';

/// An ordered sequence of ASCII-safe path labels, sentinel first.
///
/// Depth equals the label count minus one: the bare root path has depth 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HierarchyPath {
    labels: Vec<String>,
}

impl HierarchyPath {
    /// The depth-0 path containing only the sentinel label.
    #[must_use]
    pub fn root() -> Self {
        Self {
            labels: vec![ROOT_LABEL.to_string()],
        }
    }

    /// Build a path from raw (possibly non-ASCII) labels below the root.
    ///
    /// The resulting path has `labels.len() + 1` labels (sentinel included)
    /// and therefore depth `labels.len()`. Each raw label is encoded with
    /// [`encode_label`]; two raw labels differing only in encoding collide
    /// deterministically.
    #[must_use]
    pub fn from_labels<S: AsRef<str>>(raw_labels: &[S]) -> Self {
        let mut labels = Vec::with_capacity(raw_labels.len() + 1);
        labels.push(ROOT_LABEL.to_string());
        labels.extend(raw_labels.iter().map(|l| encode_label(l.as_ref())));
        Self { labels }
    }

    /// Extend this path by one encoded raw label.
    #[must_use]
    pub fn child(&self, raw_label: &str) -> Self {
        let mut labels = self.labels.clone();
        labels.push(encode_label(raw_label));
        Self { labels }
    }

    /// Number of labels below the sentinel root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.labels.len() - 1
    }

    /// The encoded labels, sentinel first.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Strict-ancestor test: `self` is a proper prefix of `other`.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.labels.len() < other.labels.len()
            && other.labels[..self.labels.len()] == self.labels[..]
    }

    /// Strict-descendant test, the inverse of [`Self::is_ancestor_of`].
    #[must_use]
    pub fn is_descendant_of(&self, other: &Self) -> bool {
        other.is_ancestor_of(self)
    }

    /// The parent path, or `None` for the root path.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.labels.len() <= 1 {
            return None;
        }
        Some(Self {
            labels: self.labels[..self.labels.len() - 1].to_vec(),
        })
    }

    /// Serialize to the storage key form: labels joined with `/`.
    #[must_use]
    pub fn to_storage(&self) -> String {
        self.labels.join(&SEPARATOR.to_string())
    }

    /// Parse a storage key produced by [`Self::to_storage`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidPath`] if the string is empty, does not
    /// start with the sentinel, or contains a label that is not ASCII-safe.
    pub fn from_storage(s: &str) -> Result<Self, CoreError> {
        let labels: Vec<String> = s.split(SEPARATOR).map(str::to_string).collect();
        if labels.first().map(String::as_str) != Some(ROOT_LABEL) {
            return Err(CoreError::InvalidPath(format!(
                "path must start with '{ROOT_LABEL}': {s}"
            )));
        }
        for label in &labels {
            if label.is_empty() || !is_encoded_label(label) {
                return Err(CoreError::InvalidPath(format!(
                    "label '{label}' is not ASCII-safe in: {s}"
                )));
            }
        }
        Ok(Self { labels })
    }
}

impl fmt::Display for HierarchyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_storage())
    }
}

/// Encode one raw label into its ASCII-safe storage form.
///
/// ASCII labels are lowercased and characters outside `[a-z0-9_]` become `_`.
/// Non-ASCII labels are replaced with `seg_` plus the first 8 hex digits of
/// the SHA-256 of the label's UTF-8 bytes.
#[must_use]
pub fn encode_label(raw: &str) -> String {
    if raw.is_ascii() {
        let encoded: String = raw
            .chars()
            .map(|c| {
                let c = c.to_ascii_lowercase();
                if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        if encoded.is_empty() {
            "_".to_string()
        } else {
            encoded
        }
    } else {
        format!("{SEGMENT_PREFIX}{}", short_digest(raw))
    }
}

/// First 8 hex digits of the SHA-256 of the input's UTF-8 bytes.
#[must_use]
pub fn short_digest(raw: &str) -> String {
    let digest = Sha256::digest(raw.as_bytes());
    let mut out = String::with_capacity(8);
    for byte in &digest[..4] {
        use fmt::Write;
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Whether a stored label consists only of `[a-z0-9_]`.
fn is_encoded_label(label: &str) -> bool {
    label
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
