//! libSQL connection wrapper with per-document advisory locks.

use std::collections::HashMap;
use std::sync::Arc;

use libsql::params::IntoParams;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::DatabaseError;

/// Shared handle to the lexis database.
///
/// Cheap to clone; all clones share the connection and the advisory lock
/// map. Migrations run on open and are idempotent.
#[derive(Clone)]
pub struct LexDb {
    _database: Arc<libsql::Database>,
    conn: libsql::Connection,
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl std::fmt::Debug for LexDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LexDb").finish_non_exhaustive()
    }
}

impl LexDb {
    /// Open (or create) a local database file and run migrations.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the file cannot be opened or a migration
    /// fails.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        let database = libsql::Builder::new_local(path).build().await?;
        let conn = database.connect()?;
        let db = Self {
            _database: Arc::new(database),
            conn,
            locks: Arc::new(Mutex::new(HashMap::new())),
        };
        db.conn.execute("PRAGMA foreign_keys = ON", ()).await?;
        db.run_migrations().await?;
        Ok(db)
    }

    /// Open an in-memory database (tests).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if setup fails.
    pub async fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::open_local(":memory:").await
    }

    /// Execute a statement, returning the affected row count.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::LibSql` on failure.
    pub async fn execute(
        &self,
        sql: &str,
        params: impl IntoParams,
    ) -> Result<u64, DatabaseError> {
        Ok(self.conn.execute(sql, params).await?)
    }

    /// Run a query, returning the row cursor.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::LibSql` on failure.
    pub async fn query(
        &self,
        sql: &str,
        params: impl IntoParams,
    ) -> Result<libsql::Rows, DatabaseError> {
        Ok(self.conn.query(sql, params).await?)
    }

    /// Execute a multi-statement SQL batch (migrations).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::LibSql` on failure.
    pub async fn execute_batch(&self, sql: &str) -> Result<(), DatabaseError> {
        self.conn.execute_batch(sql).await?;
        Ok(())
    }

    /// Begin a transaction. Dropping it without commit rolls back.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::LibSql` on failure.
    pub async fn transaction(&self) -> Result<libsql::Transaction, DatabaseError> {
        Ok(self.conn.transaction().await?)
    }

    /// Acquire the advisory write lock for a document.
    ///
    /// Writers for the same document serialize on this lock; the store does
    /// not take it implicitly, the indexing orchestrator holds it across the
    /// whole persist-and-embed sequence.
    pub async fn lock_document(&self, document_id: &str) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut map = self.locks.lock().await;
            map.entry(document_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        mutex.lock_owned().await
    }
}
