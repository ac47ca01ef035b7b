//! Transient database error retry logic.
//!
//! SQLite surfaces writer contention as `database is locked` / busy errors
//! that resolve on their own once the competing transaction finishes. The
//! orchestrators wrap their store writes in [`with_retry`]; invariant
//! violations and genuine SQL errors are never retried.

use std::future::Future;
use std::time::Duration;

use crate::error::DatabaseError;

/// Configuration for retry behavior on transient store errors.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial one).
    pub max_attempts: u32,
    /// Initial delay before the first retry.
    pub base_delay: Duration,
    /// Maximum delay between retries (backoff is capped here).
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryConfig {
    /// Backoff delay before retry number `attempt` (1-based), doubling from
    /// `base_delay` and capped at `max_delay`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Detect transient SQLite contention errors.
///
/// The predicate is intentionally narrow to avoid retrying genuine SQL or
/// constraint errors.
#[must_use]
pub fn is_transient_db_error(e: &DatabaseError) -> bool {
    match e {
        DatabaseError::LibSql(inner) => {
            let msg = inner.to_string();
            msg.contains("database is locked")
                || msg.contains("database table is locked")
                || msg.contains("database is busy")
        }
        _ => false,
    }
}

/// Run `op`, retrying transient failures with exponential backoff.
///
/// # Errors
///
/// Returns the last error once `config.max_attempts` is exhausted, and any
/// non-transient error immediately.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, op: F) -> Result<T, DatabaseError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, DatabaseError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if is_transient_db_error(&e) && attempt < config.max_attempts => {
                tracing::debug!(attempt, error = %e, "transient store error, retrying");
                tokio::time::sleep(config.delay_for(attempt)).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
