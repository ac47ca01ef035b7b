//! # lex-config
//!
//! Layered configuration loading for lexis using figment.
//!
//! Configuration sources (later sources win):
//! 1. Built-in defaults
//! 2. User-level `~/.config/lexis/config.toml`
//! 3. Project-level `.lexis/config.toml`
//! 4. Environment variables (`LEX_*`, `__` as section separator)

mod chunking;
mod database;
mod embedding;
mod error;
mod retrieval;

pub use chunking::ChunkingConfig;
pub use database::DatabaseConfig;
pub use embedding::EmbeddingConfig;
pub use error::ConfigError;
pub use retrieval::RetrievalConfig;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "LEX_";

/// Complete lexis configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LexisConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

/// User-level config file path.
fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lexis").join("config.toml"))
}

impl LexisConfig {
    /// Load configuration, layering files and environment over defaults.
    ///
    /// `project_root` is where `.lexis/config.toml` is looked up; pass the
    /// working directory for CLI use.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a present source fails to parse or a
    /// value fails to deserialize. Missing files are not errors.
    pub fn load(project_root: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(user) = user_config_path() {
            figment = figment.merge(Toml::file(user));
        }
        if let Some(root) = project_root {
            figment = figment.merge(Toml::file(root.join(".lexis").join("config.toml")));
        }
        let config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        Ok(config)
    }
}
