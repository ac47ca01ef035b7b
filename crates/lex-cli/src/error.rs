//! CLI error convergence and exit-code mapping.
//!
//! Exit codes: 0 success, 2 invariant violation, 3 I/O error, 4 cancelled.

use thiserror::Error;

/// All crate errors converge here.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] lex_config::ConfigError),

    #[error(transparent)]
    Database(#[from] lex_db::DatabaseError),

    #[error(transparent)]
    Embedding(#[from] lex_embeddings::EmbeddingError),

    #[error(transparent)]
    Index(#[from] lex_index::IndexError),

    #[error(transparent)]
    Retrieve(#[from] lex_retrieve::RetrieveError),

    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Index(e) => match e.kind() {
                "invariant_violation" => 2,
                "cancelled" => 4,
                _ => 3,
            },
            Self::Retrieve(e) => match e.kind() {
                "cancelled" => 4,
                _ => 3,
            },
            Self::Database(lex_db::DatabaseError::InvariantViolation(_)) => 2,
            _ => 3,
        }
    }
}
