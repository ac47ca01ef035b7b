//! # lex-vector
//!
//! Two-layer embedding store for lexis.
//!
//! Summary-layer and detail-layer vectors live in disjoint tables keyed by
//! chunk id, in the same libSQL database as the chunks themselves (deleting
//! a chunk cascades to both tables). Search is a brute-force cosine scan —
//! deterministic and correct at any dimension, bounded by table size, with
//! ties broken by lexicographic chunk id.

mod error;

pub use error::VectorStoreError;

use std::collections::HashSet;

use lex_core::{ChunkId, DocumentId, IndexingLayer};
use lex_db::LexDb;

/// One nearest-neighbor result.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchHit {
    pub chunk_id: ChunkId,
    /// Cosine similarity against the query vector, in `[-1, 1]`.
    pub score: f32,
}

/// Filters applied during search.
///
/// `None` means unfiltered; an empty set matches nothing.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    /// Restrict to chunks of these documents.
    pub documents: Option<Vec<DocumentId>>,
    /// Restrict to this explicit chunk id set (descendant restriction).
    pub chunks: Option<HashSet<ChunkId>>,
}

/// Embedding persistence over a shared [`LexDb`] handle.
#[derive(Debug, Clone)]
pub struct VectorStore {
    db: LexDb,
    dim: usize,
}

/// The SQL table backing a single layer.
fn table_for(layer: IndexingLayer) -> Result<&'static str, VectorStoreError> {
    match layer {
        IndexingLayer::Summary => Ok("embeddings_summary"),
        IndexingLayer::Detail => Ok("embeddings_detail"),
        IndexingLayer::Both => Err(VectorStoreError::InvalidLayer(layer)),
    }
}

/// Encode a vector as a little-endian f32 blob.
fn vector_to_blob(vector: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

/// Decode a little-endian f32 blob.
fn blob_to_vector(blob: &[u8]) -> Option<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return None;
    }
    Some(
        blob.chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
    )
}

/// Cosine similarity between two equal-length vectors.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

impl VectorStore {
    /// Create a store over `db` with a fixed vector dimension.
    #[must_use]
    pub const fn new(db: LexDb, dim: usize) -> Self {
        Self { db, dim }
    }

    /// The configured vector dimension.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    fn check_dim(&self, vector: &[f32]) -> Result<(), VectorStoreError> {
        if vector.len() == self.dim {
            Ok(())
        } else {
            Err(VectorStoreError::DimensionMismatch {
                expected: self.dim,
                actual: vector.len(),
            })
        }
    }

    /// Insert or replace the row for `(chunk_id, layer)`.
    ///
    /// # Errors
    ///
    /// Returns [`VectorStoreError::DimensionMismatch`] if the vector length
    /// disagrees with the configured dimension, and
    /// [`VectorStoreError::InvalidLayer`] for `both` (partition first).
    pub async fn upsert(
        &self,
        chunk_id: &ChunkId,
        vector: &[f32],
        layer: IndexingLayer,
    ) -> Result<(), VectorStoreError> {
        self.check_dim(vector)?;
        let table = table_for(layer)?;
        self.db
            .execute(
                &format!(
                    "INSERT OR REPLACE INTO {table} (chunk_id, vector, dim) VALUES (?1, ?2, ?3)"
                ),
                libsql::params![
                    chunk_id.as_str(),
                    vector_to_blob(vector),
                    self.dim as i64
                ],
            )
            .await
            .map_err(VectorStoreError::Database)?;
        Ok(())
    }

    /// Top-`k` nearest neighbors in one layer under cosine similarity.
    ///
    /// Brute-force scan over the layer table, restricted by `filters`. Ties
    /// are broken by lexicographic chunk id so results are stable even when
    /// the embedder is not.
    ///
    /// # Errors
    ///
    /// Returns [`VectorStoreError::DimensionMismatch`] for a misfit query
    /// vector, and database/decoding failures.
    pub async fn search(
        &self,
        query: &[f32],
        layer: IndexingLayer,
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchHit>, VectorStoreError> {
        self.check_dim(query)?;
        let table = table_for(layer)?;
        if k == 0 {
            return Ok(Vec::new());
        }
        // An explicitly empty filter set matches nothing.
        if filters.documents.as_ref().is_some_and(Vec::is_empty)
            || filters.chunks.as_ref().is_some_and(HashSet::is_empty)
        {
            return Ok(Vec::new());
        }

        let mut sql = format!(
            "SELECT e.chunk_id, e.vector FROM {table} e \
             JOIN chunks c ON c.id = e.chunk_id"
        );
        let mut params: Vec<libsql::Value> = Vec::new();
        if let Some(documents) = &filters.documents {
            let placeholders: Vec<String> = (1..=documents.len()).map(|i| format!("?{i}")).collect();
            sql.push_str(&format!(
                " WHERE c.document_id IN ({})",
                placeholders.join(", ")
            ));
            params.extend(documents.iter().map(|d| d.as_str().into()));
        }

        let mut rows = self
            .db
            .query(&sql, libsql::params_from_iter(params))
            .await
            .map_err(VectorStoreError::Database)?;

        let mut hits: Vec<SearchHit> = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| VectorStoreError::Database(e.into()))?
        {
            let chunk_id = ChunkId::from_raw(
                row.get::<String>(0)
                    .map_err(|e| VectorStoreError::Database(e.into()))?,
            );
            if let Some(allowed) = &filters.chunks {
                if !allowed.contains(&chunk_id) {
                    continue;
                }
            }
            let blob = row
                .get::<Vec<u8>>(1)
                .map_err(|e| VectorStoreError::Database(e.into()))?;
            let vector = blob_to_vector(&blob).ok_or_else(|| VectorStoreError::Corrupt {
                chunk_id: chunk_id.to_string(),
                reason: "blob length is not a multiple of 4".to_string(),
            })?;
            if vector.len() != self.dim {
                return Err(VectorStoreError::Corrupt {
                    chunk_id: chunk_id.to_string(),
                    reason: format!("stored dim {} != configured {}", vector.len(), self.dim),
                });
            }
            hits.push(SearchHit {
                score: cosine_similarity(query, &vector),
                chunk_id,
            });
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    /// Remove all rows for a chunk across both layers.
    ///
    /// # Errors
    ///
    /// Returns `VectorStoreError::Database` on SQL failure.
    pub async fn delete_for_chunk(&self, chunk_id: &ChunkId) -> Result<(), VectorStoreError> {
        for table in ["embeddings_summary", "embeddings_detail"] {
            self.db
                .execute(
                    &format!("DELETE FROM {table} WHERE chunk_id = ?1"),
                    libsql::params![chunk_id.as_str()],
                )
                .await
                .map_err(VectorStoreError::Database)?;
        }
        Ok(())
    }

    /// Remove all rows for a document's chunks across both layers.
    ///
    /// # Errors
    ///
    /// Returns `VectorStoreError::Database` on SQL failure.
    pub async fn delete_for_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<(), VectorStoreError> {
        for table in ["embeddings_summary", "embeddings_detail"] {
            self.db
                .execute(
                    &format!(
                        "DELETE FROM {table} WHERE chunk_id IN \
                         (SELECT id FROM chunks WHERE document_id = ?1)"
                    ),
                    libsql::params![document_id.as_str()],
                )
                .await
                .map_err(VectorStoreError::Database)?;
        }
        Ok(())
    }

    /// Row count in one layer, optionally restricted to a document.
    ///
    /// # Errors
    ///
    /// Returns `VectorStoreError::Database` on SQL failure.
    pub async fn count(
        &self,
        layer: IndexingLayer,
        document_id: Option<&DocumentId>,
    ) -> Result<u64, VectorStoreError> {
        let table = table_for(layer)?;
        let (sql, params) = match document_id {
            Some(id) => (
                format!(
                    "SELECT COUNT(*) FROM {table} e JOIN chunks c ON c.id = e.chunk_id \
                     WHERE c.document_id = ?1"
                ),
                vec![libsql::Value::from(id.as_str())],
            ),
            None => (format!("SELECT COUNT(*) FROM {table}"), Vec::new()),
        };
        let mut rows = self
            .db
            .query(&sql, libsql::params_from_iter(params))
            .await
            .map_err(VectorStoreError::Database)?;
        let row = rows
            .next()
            .await
            .map_err(|e| VectorStoreError::Database(e.into()))?
            .ok_or(VectorStoreError::Database(lex_db::DatabaseError::NoResult))?;
        let count = row
            .get::<i64>(0)
            .map_err(|e| VectorStoreError::Database(e.into()))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}
