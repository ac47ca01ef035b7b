//! Application context: configuration resolved into live stores.

use std::sync::Arc;

use lex_chunker::{Chunker, ChunkerConfig};
use lex_config::LexisConfig;
use lex_db::{ChunkStore, LexDb};
use lex_embeddings::{Embedder, FastembedEngine, FastembedOptions};
use lex_index::{Indexer, IndexerConfig};
use lex_retrieve::Retriever;
use lex_vector::VectorStore;
use tracing::warn;

use crate::error::CliError;

/// Live handles shared by all commands.
pub struct AppContext {
    pub config: LexisConfig,
    pub store: ChunkStore,
    pub vectors: VectorStore,
    embedder: Arc<FastembedEngine>,
}

impl AppContext {
    /// Open the database and load the embedding model.
    ///
    /// # Errors
    ///
    /// Returns [`CliError`] if the database cannot be opened or the model
    /// cannot be initialized.
    pub async fn init(config: LexisConfig, db_override: Option<&str>) -> Result<Self, CliError> {
        let db_path = db_override.unwrap_or(&config.database.path);
        let db = LexDb::open_local(db_path).await?;

        let engine = FastembedEngine::new(&FastembedOptions {
            cache_dir: config.embedding.cache_dir.clone(),
            show_download_progress: true,
        })?;
        if engine.dim() != config.embedding.dim {
            warn!(
                configured = config.embedding.dim,
                model = engine.dim(),
                "configured embedding dim disagrees with the model; using the model's"
            );
        }
        let vectors = VectorStore::new(db.clone(), engine.dim());

        Ok(Self {
            config,
            store: ChunkStore::new(db),
            vectors,
            embedder: Arc::new(engine),
        })
    }

    /// Build the indexing orchestrator.
    #[must_use]
    pub fn indexer(&self) -> Indexer<FastembedEngine> {
        let chunker = Chunker::new(ChunkerConfig {
            max_chunk_chars: self.config.chunking.max_chunk_chars,
            summary_max_chars: self.config.chunking.summary_max_chars,
        });
        Indexer::new(
            self.store.clone(),
            self.vectors.clone(),
            Arc::clone(&self.embedder),
            chunker,
            IndexerConfig {
                batch_size: self.config.embedding.batch_size,
                ..IndexerConfig::default()
            },
        )
    }

    /// Build the retrieval orchestrator.
    #[must_use]
    pub fn retriever(&self) -> Retriever<FastembedEngine> {
        Retriever::new(
            self.store.clone(),
            self.vectors.clone(),
            Arc::clone(&self.embedder),
        )
    }
}
