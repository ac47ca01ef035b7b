//! # lex-retrieve
//!
//! Retrieval orchestrator for lexis.
//!
//! The summary-first strategy localizes a query to thematic regions
//! (document/chapter/article summaries) before expanding into their
//! descendants through the closure table, which keeps context assembly
//! cheap and provenance explicit. The direct strategy searches the detail
//! layer in one pass. Both return a [`ResultPack`] whose primaries carry
//! their ancestor chain, display paths rebuilt from chunk metadata.

mod error;
mod options;
mod pack;

pub use error::RetrieveError;
pub use options::{CONTENT_MAX_LENGTH_RANGE, RetrievalStrategy, RetrieveOptions, TOP_K_RANGE};
pub use pack::{PrimaryChunk, ResultGroup, ResultPack, RetrievedChunk};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use lex_core::{ChunkId, IndexingLayer};
use lex_db::ChunkStore;
use lex_embeddings::Embedder;
use lex_vector::{SearchFilters, VectorStore};
use tracing::{debug, warn};

use pack::{display_path, truncate_content};

/// A ranked candidate primary chunk before context assembly.
#[derive(Debug, Clone)]
struct Candidate {
    chunk_id: ChunkId,
    score: f32,
    summary_score: f32,
}

/// Retrieval orchestrator, generic over the embedding client.
#[derive(Debug, Clone)]
pub struct Retriever<E> {
    store: ChunkStore,
    vectors: VectorStore,
    embedder: Arc<E>,
}

fn deadline_expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

fn rank_candidates(candidates: &mut Vec<Candidate>) {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.summary_score
                    .partial_cmp(&a.summary_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
    // Deduplicate across groups, keeping the earliest (best-ranked).
    let mut seen: HashSet<ChunkId> = HashSet::new();
    candidates.retain(|c| seen.insert(c.chunk_id.clone()));
}

impl<E: Embedder> Retriever<E> {
    #[must_use]
    pub const fn new(store: ChunkStore, vectors: VectorStore, embedder: Arc<E>) -> Self {
        Self {
            store,
            vectors,
            embedder,
        }
    }

    /// Answer a query with ranked result groups and ancestor context.
    ///
    /// # Errors
    ///
    /// Returns [`RetrieveError::InvalidOptions`] for out-of-range options,
    /// [`RetrieveError::Cancelled`] if the deadline expires before any group
    /// is assembled (partial packs are returned otherwise), and store /
    /// embedding failures.
    pub async fn retrieve(
        &self,
        query: &str,
        opts: &RetrieveOptions,
    ) -> Result<ResultPack, RetrieveError> {
        opts.validate()?;
        if deadline_expired(opts.deadline) {
            return Err(RetrieveError::Cancelled);
        }

        let query_vector = self.embedder.embed_one(query.to_string()).await?;
        let filters = SearchFilters {
            documents: opts.document_filter.clone(),
            chunks: None,
        };

        let summary_first =
            opts.strategy == RetrievalStrategy::SummaryFirst && opts.summary_k > 0;
        let mut strategy = RetrievalStrategy::Direct;
        let mut candidates = Vec::new();
        if summary_first {
            candidates = self
                .summary_first_candidates(&query_vector, opts, &filters)
                .await?;
            if candidates.is_empty() {
                debug!("summary phase returned no hits, falling through to direct");
            } else {
                strategy = RetrievalStrategy::SummaryFirst;
            }
        }
        if candidates.is_empty() {
            candidates = self.direct_candidates(&query_vector, opts, &filters).await?;
        }

        rank_candidates(&mut candidates);
        candidates.truncate(opts.top_k);

        let mut pack = ResultPack {
            query: query.to_string(),
            strategy,
            groups: Vec::with_capacity(candidates.len()),
            total_char_count: 0,
        };

        for candidate in candidates {
            if deadline_expired(opts.deadline) {
                if pack.groups.is_empty() {
                    return Err(RetrieveError::Cancelled);
                }
                warn!(
                    assembled = pack.groups.len(),
                    "deadline expired, returning partial results"
                );
                break;
            }
            pack.groups.push(self.assemble_group(candidate, opts).await?);
        }

        pack.sync_char_count();
        Ok(pack)
    }

    /// Phase 1 + 2: summary hits expanded into their best detail chunks.
    async fn summary_first_candidates(
        &self,
        query_vector: &[f32],
        opts: &RetrieveOptions,
        filters: &SearchFilters,
    ) -> Result<Vec<Candidate>, RetrieveError> {
        let summaries = self
            .vectors
            .search(query_vector, IndexingLayer::Summary, opts.summary_k, filters)
            .await?;

        let mut candidates = Vec::new();
        for summary in summaries {
            if deadline_expired(opts.deadline) {
                break;
            }
            // The subtree of S, self included: a chunk indexed in both
            // layers (an article) is its own best detail expansion.
            let mut subtree: HashSet<ChunkId> = self
                .store
                .descendant_ids(&summary.chunk_id)
                .await?
                .into_iter()
                .collect();
            subtree.insert(summary.chunk_id.clone());
            let restricted = SearchFilters {
                documents: filters.documents.clone(),
                chunks: Some(subtree),
            };
            let details = self
                .vectors
                .search(
                    query_vector,
                    IndexingLayer::Detail,
                    opts.details_per_summary,
                    &restricted,
                )
                .await?;

            if details.is_empty() {
                // No detail expansion: the summary itself is the group's
                // primary chunk.
                candidates.push(Candidate {
                    chunk_id: summary.chunk_id.clone(),
                    score: summary.score,
                    summary_score: summary.score,
                });
            } else {
                for detail in details {
                    candidates.push(Candidate {
                        chunk_id: detail.chunk_id,
                        score: detail.score,
                        summary_score: summary.score,
                    });
                }
            }
        }
        Ok(candidates)
    }

    /// Single-phase detail-layer search.
    async fn direct_candidates(
        &self,
        query_vector: &[f32],
        opts: &RetrieveOptions,
        filters: &SearchFilters,
    ) -> Result<Vec<Candidate>, RetrieveError> {
        let hits = self
            .vectors
            .search(query_vector, IndexingLayer::Detail, opts.top_k, filters)
            .await?;
        Ok(hits
            .into_iter()
            .map(|hit| Candidate {
                chunk_id: hit.chunk_id,
                score: hit.score,
                summary_score: hit.score,
            })
            .collect())
    }

    /// Fetch a candidate's chunk, ancestors, and optional siblings.
    async fn assemble_group(
        &self,
        candidate: Candidate,
        opts: &RetrieveOptions,
    ) -> Result<ResultGroup, RetrieveError> {
        let chunk = self.store.get_chunk(&candidate.chunk_id).await?;
        // The full chain is always fetched: display paths are rebuilt from
        // ancestor metadata even when ancestors are not returned.
        let ancestors = self.store.get_ancestors(&chunk.id, None).await?;

        let primary = PrimaryChunk {
            chunk_id: chunk.id.clone(),
            path_display: display_path(&chunk, &ancestors),
            kind: chunk.kind,
            content: truncate_content(&chunk.content, opts.content_max_length),
            score: candidate.score,
        };

        let ancestor_chunks = if opts.include_ancestors {
            ancestors
                .iter()
                .enumerate()
                .map(|(i, ancestor)| RetrievedChunk {
                    chunk_id: ancestor.id.clone(),
                    path_display: display_path(ancestor, &ancestors[i + 1..]),
                    kind: ancestor.kind,
                    content: truncate_content(&ancestor.content, opts.content_max_length),
                })
                .collect()
        } else {
            Vec::new()
        };

        let siblings = if opts.include_siblings {
            let siblings = self.store.get_siblings(&chunk.id).await?;
            Some(
                siblings
                    .iter()
                    .map(|sibling| RetrievedChunk {
                        chunk_id: sibling.id.clone(),
                        // Siblings share the primary's ancestor chain.
                        path_display: display_path(sibling, &ancestors),
                        kind: sibling.kind,
                        content: truncate_content(&sibling.content, opts.content_max_length),
                    })
                    .collect(),
            )
        } else {
            None
        };

        Ok(ResultGroup {
            primary,
            ancestors: ancestor_chunks,
            siblings,
        })
    }
}
