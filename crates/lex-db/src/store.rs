//! Chunk store operations: documents, chunk trees, closure table.

use chrono::Utc;
use lex_core::{Chunk, ChunkId, Document, DocumentId};
use std::collections::HashMap;
use tracing::debug;

use crate::LexDb;
use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, get_usize, parse_datetime, parse_enum, parse_metadata};

/// Column list shared by every chunk SELECT, matching [`row_to_chunk`].
const CHUNK_COLUMNS: &str = "id, document_id, content, path, kind, indexing_layer, parent_id, \
     depth, position, source_file, page_number, char_count, article_number, chapter_number, \
     metadata, created_at";

/// Document-level row without its chunks, for listings.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub title: String,
    pub source_file: String,
    pub law_category: Option<String>,
    pub version: Option<String>,
    pub total_chars: usize,
    pub chunk_count: usize,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

/// Persistence operations over the chunk tree tables.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    db: LexDb,
}

fn row_to_chunk(row: &libsql::Row) -> Result<Chunk, DatabaseError> {
    let path = lex_core::HierarchyPath::from_storage(&row.get::<String>(3)?)
        .map_err(|e| DatabaseError::Query(e.to_string()))?;
    let stored_depth = get_usize(row, 7)?;
    if stored_depth != path.depth() {
        return Err(DatabaseError::InvariantViolation(format!(
            "stored depth {stored_depth} disagrees with path depth {}",
            path.depth()
        )));
    }
    Ok(Chunk {
        id: ChunkId::from_raw(row.get::<String>(0)?),
        document_id: DocumentId::parse(&row.get::<String>(1)?)
            .map_err(|e| DatabaseError::Query(e.to_string()))?,
        content: row.get::<String>(2)?,
        path,
        kind: parse_enum(&row.get::<String>(4)?)?,
        indexing_layer: parse_enum(&row.get::<String>(5)?)?,
        parent_id: get_opt_string(row, 6)?.map(ChunkId::from_raw),
        // Relation queries return chunks without their child lists;
        // `get_document` rebuilds them from parent edges and positions.
        children_ids: Vec::new(),
        source_file: row.get::<String>(9)?,
        page_number: u32::try_from(row.get::<i64>(10)?).unwrap_or(1),
        char_count: get_usize(row, 11)?,
        article_number: get_opt_string(row, 12)?,
        chapter_number: get_opt_string(row, 13)?,
        metadata: parse_metadata(get_opt_string(row, 14)?.as_deref())?,
        created_at: parse_datetime(&row.get::<String>(15)?)?,
    })
}

fn row_to_record(row: &libsql::Row) -> Result<DocumentRecord, DatabaseError> {
    Ok(DocumentRecord {
        id: DocumentId::parse(&row.get::<String>(0)?)
            .map_err(|e| DatabaseError::Query(e.to_string()))?,
        title: row.get::<String>(1)?,
        source_file: row.get::<String>(2)?,
        law_category: get_opt_string(row, 3)?,
        version: get_opt_string(row, 4)?,
        total_chars: get_usize(row, 5)?,
        chunk_count: get_usize(row, 6)?,
        created_at: parse_datetime(&row.get::<String>(7)?)?,
        updated_at: parse_datetime(&row.get::<String>(8)?)?,
    })
}

/// Check the batch-local tree invariants before anything is written.
fn check_batch_invariants(chunks: &[Chunk]) -> Result<(), DatabaseError> {
    let mut seen: HashMap<&str, &Chunk> = HashMap::new();
    for chunk in chunks {
        match (&chunk.parent_id, chunk.depth()) {
            (None, 0) => {}
            (None, _) => {
                return Err(DatabaseError::InvariantViolation(format!(
                    "non-root chunk {} has no parent",
                    chunk.id
                )));
            }
            (Some(_), 0) => {
                return Err(DatabaseError::InvariantViolation(format!(
                    "root chunk {} has a parent",
                    chunk.id
                )));
            }
            (Some(parent_id), depth) => {
                let parent = seen.get(parent_id.as_str()).copied().ok_or_else(|| {
                    DatabaseError::InvariantViolation(format!(
                        "chunk {} references parent {parent_id} not present earlier in the batch",
                        chunk.id
                    ))
                })?;
                if parent.depth() + 1 != depth {
                    return Err(DatabaseError::InvariantViolation(format!(
                        "chunk {} at depth {depth} has parent at depth {}",
                        chunk.id,
                        parent.depth()
                    )));
                }
                if !parent.path.is_ancestor_of(&chunk.path) {
                    return Err(DatabaseError::InvariantViolation(format!(
                        "chunk {} path {} is not under parent path {}",
                        chunk.id, chunk.path, parent.path
                    )));
                }
            }
        }
        if seen.insert(chunk.id.as_str(), chunk).is_some() {
            return Err(DatabaseError::InvariantViolation(format!(
                "duplicate chunk id {} in batch",
                chunk.id
            )));
        }
    }
    Ok(())
}

async fn insert_document_tx(
    tx: &libsql::Transaction,
    doc: &Document,
) -> Result<(), DatabaseError> {
    // Replacing a document is delete-then-insert so every dependent row
    // (chunks, closure, embeddings) cascades away first.
    tx.execute(
        "DELETE FROM documents WHERE id = ?1",
        libsql::params![doc.id.as_str()],
    )
    .await?;
    tx.execute(
        "INSERT INTO documents \
         (id, title, source_file, law_category, version, total_chars, chunk_count, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        libsql::params![
            doc.id.as_str(),
            doc.title.as_str(),
            doc.source_file.as_str(),
            doc.law_category.as_deref(),
            doc.version.as_deref(),
            doc.total_chars as i64,
            doc.chunk_count as i64,
            doc.created_at.to_rfc3339(),
            doc.updated_at.to_rfc3339()
        ],
    )
    .await?;
    Ok(())
}

async fn insert_chunks_tx(
    tx: &libsql::Transaction,
    chunks: &[Chunk],
) -> Result<(), DatabaseError> {
    check_batch_invariants(chunks)?;
    for (position, chunk) in chunks.iter().enumerate() {
        let metadata = if chunk.metadata.is_empty() {
            None
        } else {
            Some(
                serde_json::to_string(&chunk.metadata)
                    .map_err(|e| DatabaseError::Query(format!("metadata serialization: {e}")))?,
            )
        };
        tx.execute(
            "INSERT INTO chunks \
             (id, document_id, content, path, kind, indexing_layer, parent_id, depth, position, \
              source_file, page_number, char_count, article_number, chapter_number, metadata, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            libsql::params![
                chunk.id.as_str(),
                chunk.document_id.as_str(),
                chunk.content.as_str(),
                chunk.path.to_storage(),
                chunk.kind.as_str(),
                chunk.indexing_layer.as_str(),
                chunk.parent_id.as_ref().map(ChunkId::as_str),
                chunk.depth() as i64,
                position as i64,
                chunk.source_file.as_str(),
                i64::from(chunk.page_number),
                chunk.char_count as i64,
                chunk.article_number.as_deref(),
                chunk.chapter_number.as_deref(),
                metadata,
                chunk.created_at.to_rfc3339()
            ],
        )
        .await?;
    }
    Ok(())
}

async fn rebuild_closure_tx(
    tx: &libsql::Transaction,
    document_id: &DocumentId,
) -> Result<u64, DatabaseError> {
    tx.execute(
        "DELETE FROM chunk_closure WHERE descendant_id IN \
         (SELECT id FROM chunks WHERE document_id = ?1)",
        libsql::params![document_id.as_str()],
    )
    .await?;

    let mut rows = tx
        .query(
            "SELECT id, parent_id FROM chunks WHERE document_id = ?1 ORDER BY position",
            libsql::params![document_id.as_str()],
        )
        .await?;
    let mut parents: HashMap<String, Option<String>> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    while let Some(row) = rows.next().await? {
        let id = row.get::<String>(0)?;
        parents.insert(id.clone(), row.get::<Option<String>>(1)?);
        order.push(id);
    }

    let mut inserted = 0_u64;
    for id in &order {
        // Walk the parent chain upward; depth d yields d+1 rows including
        // the distance-0 self edge.
        let mut ancestor = Some(id.clone());
        let mut distance = 0_i64;
        while let Some(current) = ancestor {
            tx.execute(
                "INSERT INTO chunk_closure (ancestor_id, descendant_id, distance) \
                 VALUES (?1, ?2, ?3)",
                libsql::params![current.as_str(), id.as_str(), distance],
            )
            .await?;
            inserted += 1;
            distance += 1;
            ancestor = parents.get(&current).and_then(Clone::clone);
            if distance > i64::try_from(order.len()).unwrap_or(i64::MAX) {
                return Err(DatabaseError::InvariantViolation(format!(
                    "parent cycle detected at chunk {current}"
                )));
            }
        }
    }
    Ok(inserted)
}

impl ChunkStore {
    #[must_use]
    pub const fn new(db: LexDb) -> Self {
        Self { db }
    }

    /// The underlying database handle (shared with the vector store).
    #[must_use]
    pub const fn db(&self) -> &LexDb {
        &self.db
    }

    /// Persist a whole document tree — document row, chunk batch, closure —
    /// in a single transaction. Replaces any prior document with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::InvariantViolation`] if the document fails
    /// validation, and rolls back on any failure.
    pub async fn save_tree(&self, doc: &Document) -> Result<(), DatabaseError> {
        doc.validate()
            .map_err(|e| DatabaseError::InvariantViolation(e.to_string()))?;
        let tx = self.db.transaction().await?;
        insert_document_tx(&tx, doc).await?;
        insert_chunks_tx(&tx, &doc.chunks).await?;
        let closure_rows = rebuild_closure_tx(&tx, &doc.id).await?;
        tx.commit().await?;
        debug!(
            document_id = %doc.id,
            chunks = doc.chunk_count,
            closure_rows,
            "document tree saved"
        );
        Ok(())
    }

    /// Insert the document row alone, cascading away any prior document with
    /// the same id.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` on SQL failure.
    pub async fn save_document(&self, doc: &Document) -> Result<(), DatabaseError> {
        let tx = self.db.transaction().await?;
        insert_document_tx(&tx, doc).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Insert a chunk batch in one transaction.
    ///
    /// The batch must be self-contained and pre-ordered: every non-root
    /// chunk's parent appears earlier in the slice.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::InvariantViolation`] without writing anything
    /// if any parent/depth/path invariant fails.
    pub async fn save_chunks_batch(&self, chunks: &[Chunk]) -> Result<(), DatabaseError> {
        let tx = self.db.transaction().await?;
        insert_chunks_tx(&tx, chunks).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Rebuild the closure table for one document from its parent edges.
    ///
    /// Idempotent: the prior edge set is replaced atomically. Returns the
    /// number of rows materialized (Σ over chunks of depth + 1).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` on SQL failure or a parent cycle.
    pub async fn build_closure(&self, document_id: &DocumentId) -> Result<u64, DatabaseError> {
        let tx = self.db.transaction().await?;
        let inserted = rebuild_closure_tx(&tx, document_id).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    /// Fetch one chunk by id.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::NoResult`] if the id is unknown.
    pub async fn get_chunk(&self, chunk_id: &ChunkId) -> Result<Chunk, DatabaseError> {
        let mut rows = self
            .db
            .query(
                &format!("SELECT {CHUNK_COLUMNS} FROM chunks WHERE id = ?1"),
                libsql::params![chunk_id.as_str()],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_chunk(&row)
    }

    /// Ancestors of a chunk ordered by ascending distance (nearest first).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` on SQL failure.
    pub async fn get_ancestors(
        &self,
        chunk_id: &ChunkId,
        max_distance: Option<u32>,
    ) -> Result<Vec<Chunk>, DatabaseError> {
        let sql = format!(
            "SELECT {CHUNK_COLUMNS} FROM chunks \
             JOIN chunk_closure cc ON cc.ancestor_id = chunks.id \
             WHERE cc.descendant_id = ?1 AND cc.distance >= 1 AND cc.distance <= ?2 \
             ORDER BY cc.distance ASC"
        );
        let max = max_distance.map_or(i64::MAX, i64::from);
        let mut rows = self
            .db
            .query(&sql, libsql::params![chunk_id.as_str(), max])
            .await?;
        let mut chunks = Vec::new();
        while let Some(row) = rows.next().await? {
            chunks.push(row_to_chunk(&row)?);
        }
        Ok(chunks)
    }

    /// Descendants of a chunk ordered by ascending distance, then pre-order
    /// position.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` on SQL failure.
    pub async fn get_descendants(
        &self,
        chunk_id: &ChunkId,
        max_distance: Option<u32>,
    ) -> Result<Vec<Chunk>, DatabaseError> {
        let sql = format!(
            "SELECT {CHUNK_COLUMNS} FROM chunks \
             JOIN chunk_closure cc ON cc.descendant_id = chunks.id \
             WHERE cc.ancestor_id = ?1 AND cc.distance >= 1 AND cc.distance <= ?2 \
             ORDER BY cc.distance ASC, chunks.position ASC"
        );
        let max = max_distance.map_or(i64::MAX, i64::from);
        let mut rows = self
            .db
            .query(&sql, libsql::params![chunk_id.as_str(), max])
            .await?;
        let mut chunks = Vec::new();
        while let Some(row) = rows.next().await? {
            chunks.push(row_to_chunk(&row)?);
        }
        Ok(chunks)
    }

    /// Ids of every descendant (any distance) of a chunk.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` on SQL failure.
    pub async fn descendant_ids(&self, chunk_id: &ChunkId) -> Result<Vec<ChunkId>, DatabaseError> {
        let mut rows = self
            .db
            .query(
                "SELECT descendant_id FROM chunk_closure \
                 WHERE ancestor_id = ?1 AND distance >= 1",
                libsql::params![chunk_id.as_str()],
            )
            .await?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(ChunkId::from_raw(row.get::<String>(0)?));
        }
        Ok(ids)
    }

    /// Siblings of a chunk (same parent, self excluded) in source order.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::NoResult`] for an unknown chunk id.
    pub async fn get_siblings(&self, chunk_id: &ChunkId) -> Result<Vec<Chunk>, DatabaseError> {
        let chunk = self.get_chunk(chunk_id).await?;
        let Some(parent_id) = chunk.parent_id else {
            return Ok(Vec::new());
        };
        let sql = format!(
            "SELECT {CHUNK_COLUMNS} FROM chunks \
             WHERE parent_id = ?1 AND id != ?2 ORDER BY position ASC"
        );
        let mut rows = self
            .db
            .query(&sql, libsql::params![parent_id.as_str(), chunk_id.as_str()])
            .await?;
        let mut chunks = Vec::new();
        while let Some(row) = rows.next().await? {
            chunks.push(row_to_chunk(&row)?);
        }
        Ok(chunks)
    }

    /// Whether a document row exists.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` on SQL failure.
    pub async fn document_exists(&self, document_id: &DocumentId) -> Result<bool, DatabaseError> {
        let mut rows = self
            .db
            .query(
                "SELECT 1 FROM documents WHERE id = ?1",
                libsql::params![document_id.as_str()],
            )
            .await?;
        Ok(rows.next().await?.is_some())
    }

    /// Load a full document with its chunk tree, child lists rebuilt.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::NoResult`] for an unknown document id.
    pub async fn get_document(&self, document_id: &DocumentId) -> Result<Document, DatabaseError> {
        let mut rows = self
            .db
            .query(
                "SELECT id, title, source_file, law_category, version, total_chars, chunk_count, \
                 created_at, updated_at FROM documents WHERE id = ?1",
                libsql::params![document_id.as_str()],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        let record = row_to_record(&row)?;

        let sql = format!(
            "SELECT {CHUNK_COLUMNS} FROM chunks WHERE document_id = ?1 ORDER BY position ASC"
        );
        let mut rows = self
            .db
            .query(&sql, libsql::params![document_id.as_str()])
            .await?;
        let mut chunks = Vec::new();
        while let Some(row) = rows.next().await? {
            chunks.push(row_to_chunk(&row)?);
        }

        // Rebuild child lists from parent edges; position order of the scan
        // preserves source order.
        let mut children: HashMap<String, Vec<ChunkId>> = HashMap::new();
        for chunk in &chunks {
            if let Some(parent) = &chunk.parent_id {
                children
                    .entry(parent.as_str().to_string())
                    .or_default()
                    .push(chunk.id.clone());
            }
        }
        for chunk in &mut chunks {
            if let Some(ids) = children.remove(chunk.id.as_str()) {
                chunk.children_ids = ids;
            }
        }

        Ok(Document {
            id: record.id,
            title: record.title,
            source_file: record.source_file,
            chunks,
            total_chars: record.total_chars,
            chunk_count: record.chunk_count,
            law_category: record.law_category,
            version: record.version,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    /// All document records, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` on SQL failure.
    pub async fn list_documents(&self) -> Result<Vec<DocumentRecord>, DatabaseError> {
        let mut rows = self
            .db
            .query(
                "SELECT id, title, source_file, law_category, version, total_chars, chunk_count, \
                 created_at, updated_at FROM documents ORDER BY updated_at DESC, id ASC",
                (),
            )
            .await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(row_to_record(&row)?);
        }
        Ok(records)
    }

    /// Delete a document, cascading to chunks, closure rows, and both
    /// embedding tables.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` on SQL failure.
    pub async fn delete_document(&self, document_id: &DocumentId) -> Result<(), DatabaseError> {
        let deleted = self
            .db
            .execute(
                "DELETE FROM documents WHERE id = ?1",
                libsql::params![document_id.as_str()],
            )
            .await?;
        debug!(document_id = %document_id, deleted, "document deleted");
        Ok(())
    }

    /// Number of closure rows belonging to a document.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` on SQL failure.
    pub async fn closure_row_count(&self, document_id: &DocumentId) -> Result<u64, DatabaseError> {
        let mut rows = self
            .db
            .query(
                "SELECT COUNT(*) FROM chunk_closure cc \
                 JOIN chunks c ON c.id = cc.descendant_id WHERE c.document_id = ?1",
                libsql::params![document_id.as_str()],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(u64::try_from(row.get::<i64>(0)?).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lex_chunker::Chunker;
    use lex_core::ChunkKind;
    use pretty_assertions::assert_eq;

    const STATUTE: &str = "\
# 陸海空軍懲罰法

## 第一章 總則

### 第 1 條
本法所稱軍人，指現役軍官、士官、士兵。

### 第 2 條
軍人違反職責者，依本法懲罰之。

## 第二章 懲罰種類

### 第 7 條 懲罰之種類
懲罰之種類如下：
一、降階。
二、降級。

### 第 8 條
前條懲罰，由權責長官為之。

## 第三章 附則

### 第 9 條
本法自公布日施行。
";

    async fn store() -> ChunkStore {
        ChunkStore::new(LexDb::open_in_memory().await.unwrap())
    }

    fn statute_document() -> Document {
        let id = DocumentId::from_filename("陸海空軍懲罰法.md").unwrap();
        Chunker::default().chunk(STATUTE, "陸海空軍懲罰法.md", id)
    }

    fn article<'a>(doc: &'a Document, number: &str) -> &'a Chunk {
        doc.chunks
            .iter()
            .find(|c| c.article_number.as_deref() == Some(number))
            .unwrap_or_else(|| panic!("no article {number}"))
    }

    #[tokio::test]
    async fn save_tree_round_trips() {
        let store = store().await;
        let doc = statute_document();
        store.save_tree(&doc).await.unwrap();

        let loaded = store.get_document(&doc.id).await.unwrap();
        assert_eq!(loaded.chunk_count, doc.chunk_count);
        assert_eq!(loaded.total_chars, doc.total_chars);
        assert_eq!(loaded.title, doc.title);
        for (saved, loaded) in doc.chunks.iter().zip(&loaded.chunks) {
            assert_eq!(saved.id, loaded.id);
            assert_eq!(saved.path, loaded.path);
            assert_eq!(saved.content, loaded.content);
            assert_eq!(saved.kind, loaded.kind);
            assert_eq!(saved.children_ids, loaded.children_ids);
        }
        loaded.validate().unwrap();
    }

    #[tokio::test]
    async fn closure_row_count_is_sum_of_depths_plus_one() {
        let store = store().await;
        let doc = statute_document();
        store.save_tree(&doc).await.unwrap();

        let expected: u64 = doc.chunks.iter().map(|c| c.depth() as u64 + 1).sum();
        assert_eq!(store.closure_row_count(&doc.id).await.unwrap(), expected);
        // The 11-chunk statute: 1 root + 3 chapters + 5 articles + 2 sections.
        assert_eq!(doc.chunk_count, 11);
        assert_eq!(expected, 30);
    }

    #[tokio::test]
    async fn build_closure_is_idempotent() {
        let store = store().await;
        let doc = statute_document();
        store.save_tree(&doc).await.unwrap();

        let first = store.closure_row_count(&doc.id).await.unwrap();
        let rebuilt = store.build_closure(&doc.id).await.unwrap();
        assert_eq!(first, rebuilt);
        assert_eq!(store.closure_row_count(&doc.id).await.unwrap(), first);
    }

    #[tokio::test]
    async fn ancestors_nearest_first() {
        let store = store().await;
        let doc = statute_document();
        store.save_tree(&doc).await.unwrap();

        let seven = article(&doc, "第 7 條");
        let ancestors = store.get_ancestors(&seven.id, None).await.unwrap();
        assert_eq!(ancestors.len(), 2);
        assert_eq!(ancestors[0].kind, ChunkKind::Chapter);
        assert_eq!(ancestors[0].chapter_number.as_deref(), Some("第二章"));
        assert_eq!(ancestors[1].kind, ChunkKind::Document);

        let capped = store.get_ancestors(&seven.id, Some(1)).await.unwrap();
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].kind, ChunkKind::Chapter);
    }

    #[tokio::test]
    async fn descendants_by_distance_then_position() {
        let store = store().await;
        let doc = statute_document();
        store.save_tree(&doc).await.unwrap();

        let chapter_two = doc
            .chunks
            .iter()
            .find(|c| c.kind == ChunkKind::Chapter && c.chapter_number.as_deref() == Some("第二章"))
            .unwrap();
        let descendants = store.get_descendants(&chapter_two.id, None).await.unwrap();
        // Two articles at distance 1, then the two sections of 第 7 條.
        assert_eq!(descendants.len(), 4);
        assert_eq!(descendants[0].article_number.as_deref(), Some("第 7 條"));
        assert_eq!(descendants[1].article_number.as_deref(), Some("第 8 條"));
        assert!(descendants[2..].iter().all(|c| c.kind == ChunkKind::Section));

        let direct = store
            .get_descendants(&chapter_two.id, Some(1))
            .await
            .unwrap();
        assert_eq!(direct.len(), 2);
    }

    #[tokio::test]
    async fn siblings_preserve_source_order() {
        let store = store().await;
        let doc = statute_document();
        store.save_tree(&doc).await.unwrap();

        let seven = article(&doc, "第 7 條");
        let siblings = store.get_siblings(&seven.id).await.unwrap();
        assert_eq!(siblings.len(), 1);
        assert_eq!(siblings[0].article_number.as_deref(), Some("第 8 條"));

        let root = doc.root().unwrap();
        assert!(store.get_siblings(&root.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_document_cascades() {
        let store = store().await;
        let doc = statute_document();
        store.save_tree(&doc).await.unwrap();

        store.delete_document(&doc.id).await.unwrap();

        assert!(!store.document_exists(&doc.id).await.unwrap());
        assert_eq!(store.closure_row_count(&doc.id).await.unwrap(), 0);
        let root = &doc.chunks[0];
        assert!(matches!(
            store.get_chunk(&root.id).await,
            Err(DatabaseError::NoResult)
        ));
    }

    #[tokio::test]
    async fn save_tree_replaces_prior_document() {
        let store = store().await;
        let doc = statute_document();
        store.save_tree(&doc).await.unwrap();

        let shorter = "### 第 1 條\n新版本內容。\n";
        let reindexed = Chunker::default().chunk(shorter, "陸海空軍懲罰法.md", doc.id.clone());
        store.save_tree(&reindexed).await.unwrap();

        let loaded = store.get_document(&doc.id).await.unwrap();
        assert_eq!(loaded.chunk_count, reindexed.chunk_count);
        // Old article 7 is gone along with its closure rows.
        let seven = article(&doc, "第 7 條");
        assert!(matches!(
            store.get_chunk(&seven.id).await,
            Err(DatabaseError::NoResult)
        ));
        let expected: u64 = reindexed.chunks.iter().map(|c| c.depth() as u64 + 1).sum();
        assert_eq!(store.closure_row_count(&doc.id).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn batch_with_missing_parent_is_rejected() {
        let store = store().await;
        let doc = statute_document();
        store.save_document(&doc).await.unwrap();

        // Drop the root so every depth-1 chunk references a missing parent.
        let orphaned: Vec<Chunk> = doc.chunks[1..].to_vec();
        let result = store.save_chunks_batch(&orphaned).await;
        assert!(matches!(result, Err(DatabaseError::InvariantViolation(_))));

        // Nothing was written.
        let loaded = store.get_document(&doc.id).await.unwrap();
        assert!(loaded.chunks.is_empty());
    }

    #[tokio::test]
    async fn batch_with_depth_mismatch_is_rejected() {
        let store = store().await;
        let doc = statute_document();
        store.save_document(&doc).await.unwrap();

        let mut chunks = doc.chunks.clone();
        // Rewire a section directly under the root: depth 3 vs parent depth 0.
        if let Some(section) = chunks.iter_mut().find(|c| c.kind == ChunkKind::Section) {
            section.parent_id = Some(doc.chunks[0].id.clone());
        }
        let result = store.save_chunks_batch(&chunks).await;
        assert!(matches!(result, Err(DatabaseError::InvariantViolation(_))));
    }

    #[tokio::test]
    async fn get_document_unknown_id() {
        let store = store().await;
        let missing = DocumentId::parse("missing").unwrap();
        assert!(matches!(
            store.get_document(&missing).await,
            Err(DatabaseError::NoResult)
        ));
    }

    #[tokio::test]
    async fn list_documents_returns_records() {
        let store = store().await;
        let doc = statute_document();
        store.save_tree(&doc).await.unwrap();

        let records = store.list_documents().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, doc.id);
        assert_eq!(records[0].chunk_count, doc.chunk_count);
    }
}
