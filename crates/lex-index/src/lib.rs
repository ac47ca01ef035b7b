//! # lex-index
//!
//! Indexing orchestrator: compose the chunker, chunk store, vector store,
//! and embedding client to index documents atomically per document.
//!
//! For one document the sequence save-document → save-chunks → build-closure
//! → upsert-embeddings is totally ordered under the store's per-document
//! advisory lock; a failure or deadline expiry after persistence compensates
//! by deleting the document again, so no query ever observes a partial
//! index.

mod error;

pub use error::IndexError;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use lex_chunker::Chunker;
use lex_core::{Chunk, ChunkId, Document, DocumentId, IndexingLayer};
use lex_db::{ChunkStore, RetryConfig, with_retry};
use lex_embeddings::Embedder;
use lex_vector::VectorStore;
use tracing::{info, warn};

/// Character cap for the short form embedded into the summary layer when a
/// chunk is indexed in both layers.
const SUMMARY_EMBED_MAX_CHARS: usize = 240;

/// Indexing policy knobs.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Texts per embedding batch.
    pub batch_size: usize,
    /// Retry policy for transient store failures.
    pub retry: RetryConfig,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            retry: RetryConfig::default(),
        }
    }
}

/// Per-call indexing options.
#[derive(Debug, Clone, Default)]
pub struct IndexRequest {
    /// Explicit document id; derived from the filename when absent.
    pub document_id: Option<DocumentId>,
    /// Replace an existing document instead of refusing.
    pub force: bool,
    /// Deadline after which the operation cancels and rolls back.
    pub deadline: Option<Instant>,
}

/// Outcome of a bulk indexing run.
#[derive(Debug, Default)]
pub struct BulkIndexReport {
    /// Successfully indexed document ids, in input order.
    pub indexed: Vec<DocumentId>,
    /// Per-file failures (only populated with `skip_errors`).
    pub failures: Vec<(PathBuf, IndexError)>,
}

/// Indexing orchestrator, generic over the embedding client.
#[derive(Debug, Clone)]
pub struct Indexer<E> {
    store: ChunkStore,
    vectors: VectorStore,
    embedder: Arc<E>,
    chunker: Chunker,
    config: IndexerConfig,
}

fn deadline_expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

/// The text embedded for a chunk in the summary layer.
///
/// Chunks indexed in both layers embed a short form here (their full body
/// goes to the detail layer); summary-only chunks already carry their short
/// content.
fn summary_embed_text(chunk: &Chunk) -> String {
    if chunk.indexing_layer == IndexingLayer::Both {
        match chunk.content.char_indices().nth(SUMMARY_EMBED_MAX_CHARS) {
            Some((byte_idx, _)) => chunk.content[..byte_idx].to_string(),
            None => chunk.content.clone(),
        }
    } else {
        chunk.content.clone()
    }
}

impl<E: Embedder> Indexer<E> {
    #[must_use]
    pub fn new(
        store: ChunkStore,
        vectors: VectorStore,
        embedder: Arc<E>,
        chunker: Chunker,
        config: IndexerConfig,
    ) -> Self {
        Self {
            store,
            vectors,
            embedder,
            chunker,
            config,
        }
    }

    /// Index one file: chunk it, persist the tree, embed both layers.
    ///
    /// Holding the document's advisory lock for the whole sequence, so
    /// concurrent attempts for the same document serialize; the second
    /// non-forcing attempt observes [`IndexError::AlreadyIndexed`].
    ///
    /// # Errors
    ///
    /// All [`IndexError`] kinds. On any failure after the tree was persisted
    /// the document is deleted again, leaving the store unchanged.
    pub async fn index_document(
        &self,
        path: &Path,
        request: IndexRequest,
    ) -> Result<Document, IndexError> {
        let document_id = match request.document_id {
            Some(id) => id,
            None => resolve_document_id(path)?,
        };

        let _guard = self.store.db().lock_document(document_id.as_str()).await;
        if deadline_expired(request.deadline) {
            return Err(IndexError::Cancelled);
        }

        let exists = self.store.document_exists(&document_id).await?;
        if exists {
            if !request.force {
                return Err(IndexError::AlreadyIndexed(document_id));
            }
            // Cascades to chunks, closure rows, and both embedding tables.
            with_retry(&self.config.retry, || {
                self.store.delete_document(&document_id)
            })
            .await?;
        }

        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| IndexError::InvalidInput {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let file_name = path.display().to_string();
        let doc = self.chunker.chunk(&text, &file_name, document_id.clone());

        if deadline_expired(request.deadline) {
            return Err(IndexError::Cancelled);
        }
        with_retry(&self.config.retry, || self.store.save_tree(&doc)).await?;

        match self.embed_document(&doc, request.deadline).await {
            Ok(()) => {
                info!(
                    document_id = %doc.id,
                    chunks = doc.chunk_count,
                    chars = doc.total_chars,
                    "document indexed"
                );
                Ok(doc)
            }
            Err(e) => {
                // Compensate so no partially-embedded document survives.
                if let Err(cleanup) = self.store.delete_document(&doc.id).await {
                    warn!(document_id = %doc.id, error = %cleanup, "rollback delete failed");
                }
                Err(e)
            }
        }
    }

    /// Embed and upsert both layer sets for a persisted document.
    async fn embed_document(
        &self,
        doc: &Document,
        deadline: Option<Instant>,
    ) -> Result<(), IndexError> {
        let summary_set: Vec<(ChunkId, String)> = doc
            .chunks
            .iter()
            .filter(|c| c.indexing_layer.includes_summary())
            .map(|c| (c.id.clone(), summary_embed_text(c)))
            .collect();
        let detail_set: Vec<(ChunkId, String)> = doc
            .chunks
            .iter()
            .filter(|c| c.indexing_layer.includes_detail())
            .map(|c| (c.id.clone(), c.content.clone()))
            .collect();

        self.embed_layer(summary_set, IndexingLayer::Summary, deadline)
            .await?;
        self.embed_layer(detail_set, IndexingLayer::Detail, deadline)
            .await
    }

    async fn embed_layer(
        &self,
        items: Vec<(ChunkId, String)>,
        layer: IndexingLayer,
        deadline: Option<Instant>,
    ) -> Result<(), IndexError> {
        for batch in items.chunks(self.config.batch_size.max(1)) {
            if deadline_expired(deadline) {
                return Err(IndexError::Cancelled);
            }
            let texts: Vec<String> = batch.iter().map(|(_, text)| text.clone()).collect();
            let vectors = self.embedder.embed_batch(texts).await?;
            for ((chunk_id, _), vector) in batch.iter().zip(&vectors) {
                let store = &self.vectors;
                with_retry(&self.config.retry, move || async move {
                    store
                        .upsert(chunk_id, vector, layer)
                        .await
                        .map_err(unwrap_vector_db_error)
                })
                .await?;
            }
        }
        Ok(())
    }

    /// Index many files; per-document failures do not abort the remaining
    /// work unless `skip_errors` is false.
    ///
    /// # Errors
    ///
    /// With `skip_errors = false`, the first failure aborts the run (the
    /// in-flight document is already rolled back by `index_document`).
    pub async fn index_many(
        &self,
        paths: &[PathBuf],
        force: bool,
        skip_errors: bool,
    ) -> Result<BulkIndexReport, IndexError> {
        let mut report = BulkIndexReport::default();
        for path in paths {
            let request = IndexRequest {
                force,
                ..IndexRequest::default()
            };
            match self.index_document(path, request).await {
                Ok(doc) => report.indexed.push(doc.id),
                Err(e) if skip_errors => {
                    warn!(path = %path.display(), error = %e, "skipping failed document");
                    report.failures.push((path.clone(), e));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    /// The underlying chunk store.
    #[must_use]
    pub const fn store(&self) -> &ChunkStore {
        &self.store
    }

    /// The underlying vector store.
    #[must_use]
    pub const fn vectors(&self) -> &VectorStore {
        &self.vectors
    }
}

fn resolve_document_id(path: &Path) -> Result<DocumentId, IndexError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| IndexError::InvalidInput {
            path: path.display().to_string(),
            reason: "path has no file name".to_string(),
        })?;
    DocumentId::from_filename(name).map_err(|e| IndexError::InvalidInput {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Unwrap a vector-store error into the database error retried by
/// `with_retry`; non-database vector errors become invariant violations
/// (wrong dimension is a configuration bug, not a transient fault).
fn unwrap_vector_db_error(e: lex_vector::VectorStoreError) -> lex_db::DatabaseError {
    match e {
        lex_vector::VectorStoreError::Database(db) => db,
        other => lex_db::DatabaseError::InvariantViolation(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lex_db::{DatabaseError, LexDb};
    use lex_embeddings::{EmbeddingError, HashEmbedder};
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use std::time::Duration;

    const DIM: usize = 32;

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

    async fn indexer() -> Indexer<HashEmbedder> {
        let db = LexDb::open_in_memory().await.unwrap();
        Indexer::new(
            ChunkStore::new(db.clone()),
            VectorStore::new(db, DIM),
            Arc::new(HashEmbedder::new(DIM)),
            Chunker::default(),
            IndexerConfig::default(),
        )
    }

    fn write_statute(dir: &tempfile::TempDir, name: &str, text: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
        path
    }

    #[tokio::test]
    async fn index_document_persists_chunks_closure_and_embeddings() {
        let indexer = indexer().await;
        let dir = tempfile::tempdir().unwrap();
        let path = write_statute(&dir, "statute.md", STATUTE);

        let doc = indexer
            .index_document(&path, IndexRequest::default())
            .await
            .unwrap();

        assert_eq!(doc.chunk_count, 11);
        let closure = indexer.store().closure_row_count(&doc.id).await.unwrap();
        assert_eq!(closure, 30, "sum of depth+1 over 11 chunks");

        // root + 3 chapters + 5 articles in the summary layer,
        // 5 articles + 2 sections in the detail layer.
        let summary = indexer
            .vectors()
            .count(IndexingLayer::Summary, Some(&doc.id))
            .await
            .unwrap();
        let detail = indexer
            .vectors()
            .count(IndexingLayer::Detail, Some(&doc.id))
            .await
            .unwrap();
        assert_eq!(summary, 9);
        assert_eq!(detail, 7);
    }

    #[tokio::test]
    async fn layer_table_membership_is_exact() {
        let indexer = indexer().await;
        let dir = tempfile::tempdir().unwrap();
        let path = write_statute(&dir, "statute.md", STATUTE);
        let doc = indexer
            .index_document(&path, IndexRequest::default())
            .await
            .unwrap();

        let expected_summary = doc
            .chunks
            .iter()
            .filter(|c| c.indexing_layer.includes_summary())
            .count() as u64;
        let expected_detail = doc
            .chunks
            .iter()
            .filter(|c| c.indexing_layer.includes_detail())
            .count() as u64;
        assert_eq!(
            indexer.vectors().count(IndexingLayer::Summary, Some(&doc.id)).await.unwrap(),
            expected_summary
        );
        assert_eq!(
            indexer.vectors().count(IndexingLayer::Detail, Some(&doc.id)).await.unwrap(),
            expected_detail
        );
    }

    #[tokio::test]
    async fn second_index_without_force_is_refused() {
        let indexer = indexer().await;
        let dir = tempfile::tempdir().unwrap();
        let path = write_statute(&dir, "statute.md", STATUTE);

        indexer
            .index_document(&path, IndexRequest::default())
            .await
            .unwrap();
        let err = indexer
            .index_document(&path, IndexRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::AlreadyIndexed(_)));
        assert_eq!(err.kind(), "already_indexed");
    }

    #[tokio::test]
    async fn force_reindex_of_modified_file_leaves_no_orphans() {
        let indexer = indexer().await;
        let dir = tempfile::tempdir().unwrap();
        let path = write_statute(&dir, "statute.md", STATUTE);

        let original = indexer
            .index_document(&path, IndexRequest::default())
            .await
            .unwrap();

        // Rewrite the file without chapter two.
        let modified = STATUTE.replace("## 第二章 懲罰種類", "").replace(
            "### 第 7 條 懲罰之種類\n懲罰之種類如下：\n一、降階。\n二、降級。\n\n### 第 8 條\n前條懲罰，由權責長官為之。\n",
            "",
        );
        std::fs::write(&path, &modified).unwrap();

        let request = IndexRequest {
            force: true,
            ..IndexRequest::default()
        };
        let reindexed = indexer.index_document(&path, request).await.unwrap();
        assert!(reindexed.total_chars < original.total_chars);

        // Removed article's chunk id is gone everywhere.
        let seven = original
            .chunks
            .iter()
            .find(|c| c.article_number.as_deref() == Some("第 7 條"))
            .unwrap();
        assert!(matches!(
            indexer.store().get_chunk(&seven.id).await,
            Err(DatabaseError::NoResult)
        ));

        // No orphan embeddings in either table.
        let summary = indexer.vectors().count(IndexingLayer::Summary, None).await.unwrap();
        let detail = indexer.vectors().count(IndexingLayer::Detail, None).await.unwrap();
        let expected_summary = reindexed
            .chunks
            .iter()
            .filter(|c| c.indexing_layer.includes_summary())
            .count() as u64;
        let expected_detail = reindexed
            .chunks
            .iter()
            .filter(|c| c.indexing_layer.includes_detail())
            .count() as u64;
        assert_eq!(summary, expected_summary);
        assert_eq!(detail, expected_detail);
    }

    #[tokio::test]
    async fn force_reindex_twice_is_idempotent() {
        let indexer = indexer().await;
        let dir = tempfile::tempdir().unwrap();
        let path = write_statute(&dir, "statute.md", STATUTE);
        let request = || IndexRequest {
            force: true,
            ..IndexRequest::default()
        };

        let first = indexer.index_document(&path, request()).await.unwrap();
        let second = indexer.index_document(&path, request()).await.unwrap();

        let first_ids: Vec<&str> = first.chunks.iter().map(|c| c.id.as_str()).collect();
        let second_ids: Vec<&str> = second.chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(first_ids, second_ids);
        assert_eq!(
            indexer.store().closure_row_count(&first.id).await.unwrap(),
            30
        );
        assert_eq!(
            indexer.vectors().count(IndexingLayer::Summary, None).await.unwrap(),
            9
        );
    }

    #[tokio::test]
    async fn unreadable_file_is_invalid_input() {
        let indexer = indexer().await;
        let err = indexer
            .index_document(Path::new("/no/such/statute.md"), IndexRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::InvalidInput { .. }));
        assert_eq!(err.file(), Some("/no/such/statute.md"));
    }

    #[tokio::test]
    async fn expired_deadline_cancels_without_writes() {
        let indexer = indexer().await;
        let dir = tempfile::tempdir().unwrap();
        let path = write_statute(&dir, "statute.md", STATUTE);

        let request = IndexRequest {
            deadline: Some(Instant::now() - Duration::from_secs(1)),
            ..IndexRequest::default()
        };
        let err = indexer.index_document(&path, request).await.unwrap_err();
        assert!(matches!(err, IndexError::Cancelled));

        let id = DocumentId::from_filename("statute.md").unwrap();
        assert!(!indexer.store().document_exists(&id).await.unwrap());
    }

    /// Embedder whose batches always fail, for rollback testing.
    struct FailingEmbedder;

    impl Embedder for FailingEmbedder {
        fn dim(&self) -> usize {
            DIM
        }

        async fn embed_batch(&self, _texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Err(EmbeddingError::EmbedFailed("offline".to_string()))
        }
    }

    #[tokio::test]
    async fn embedding_failure_rolls_back_persisted_tree() {
        let db = LexDb::open_in_memory().await.unwrap();
        let indexer = Indexer::new(
            ChunkStore::new(db.clone()),
            VectorStore::new(db, DIM),
            Arc::new(FailingEmbedder),
            Chunker::default(),
            IndexerConfig::default(),
        );
        let dir = tempfile::tempdir().unwrap();
        let path = write_statute(&dir, "statute.md", STATUTE);

        let err = indexer
            .index_document(&path, IndexRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::EmbeddingFailure(_)));

        // Document row, chunks, closure, and embeddings are all absent.
        let id = DocumentId::from_filename("statute.md").unwrap();
        assert!(!indexer.store().document_exists(&id).await.unwrap());
        assert_eq!(indexer.store().closure_row_count(&id).await.unwrap(), 0);
        assert_eq!(
            indexer.vectors().count(IndexingLayer::Summary, None).await.unwrap(),
            0
        );
        assert_eq!(
            indexer.vectors().count(IndexingLayer::Detail, None).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn concurrent_same_document_one_wins() {
        let indexer = indexer().await;
        let dir = tempfile::tempdir().unwrap();
        let path = write_statute(&dir, "statute.md", STATUTE);

        let a = {
            let indexer = indexer.clone();
            let path = path.clone();
            tokio::spawn(async move { indexer.index_document(&path, IndexRequest::default()).await })
        };
        let b = {
            let indexer = indexer.clone();
            let path = path.clone();
            tokio::spawn(async move { indexer.index_document(&path, IndexRequest::default()).await })
        };

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one concurrent index succeeds");
        let failure = if a.is_err() { a } else { b };
        assert!(matches!(failure, Err(IndexError::AlreadyIndexed(_))));
    }

    #[tokio::test]
    async fn index_many_skip_errors_accumulates_failures() {
        let indexer = indexer().await;
        let dir = tempfile::tempdir().unwrap();
        let good = write_statute(&dir, "statute.md", STATUTE);
        let missing = dir.path().join("missing.md");

        let report = indexer
            .index_many(&[good.clone(), missing.clone()], false, true)
            .await
            .unwrap();
        assert_eq!(report.indexed.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, missing);
        assert_eq!(report.failures[0].1.kind(), "invalid_input");
    }

    #[tokio::test]
    async fn index_many_aborts_on_first_error_without_skip() {
        let indexer = indexer().await;
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.md");
        let good = write_statute(&dir, "statute.md", STATUTE);

        let err = indexer
            .index_many(&[missing, good], false, false)
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::InvalidInput { .. }));

        // The good file was never reached.
        let id = DocumentId::from_filename("statute.md").unwrap();
        assert!(!indexer.store().document_exists(&id).await.unwrap());
    }
}
