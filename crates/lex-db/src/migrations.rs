//! Database migration runner.
//!
//! Embeds the SQL migration files at compile time and executes them on
//! database open. All statements use `IF NOT EXISTS` for idempotent
//! re-running.

use crate::LexDb;
use crate::error::DatabaseError;

/// Initial schema: documents, chunks, closure table, two embedding tables.
const MIGRATION_001: &str = include_str!("../migrations/001_initial.sql");

impl LexDb {
    /// Run all pending migrations. Currently a single initial migration.
    pub(crate) async fn run_migrations(&self) -> Result<(), DatabaseError> {
        self.execute_batch(MIGRATION_001)
            .await
            .map_err(|e| DatabaseError::Migration(format!("001_initial: {e}")))
    }
}
