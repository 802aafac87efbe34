//! Transaction wrapper with retry on transient database errors.
//!
//! Only errors whose database message matches a known transient marker
//! (deadlocks, lock timeouts, serialization failures) are retried; anything
//! else propagates on first occurrence. Backoff doubles per attempt:
//! `base_delay * 2^attempt`.

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionError, TransactionTrait};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::errors::RepoError;

/// Lowercase substrings that mark an error as worth retrying.
pub const TRANSIENT_MARKERS: &[&str] = &[
    "deadlock found",
    "lock wait timeout",
    "serialization failure",
    "could not serialize access",
    "database is locked",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay before re-running attempt `attempt + 1` (zero-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// True when the error's database detail matches a transient marker. Only
/// database-level errors qualify; request and validation errors never retry.
#[must_use]
pub fn is_transient(err: &RepoError) -> bool {
    let details = match err {
        RepoError::Database { internal, .. } => internal.to_string(),
        RepoError::Internal {
            internal: Some(details),
            ..
        } => details.clone(),
        _ => return false,
    };
    let details = details.to_lowercase();
    TRANSIENT_MARKERS
        .iter()
        .any(|marker| details.contains(marker))
}

/// Run `unit` inside a transaction, retrying transient failures up to
/// `policy.max_attempts` total attempts with exponential backoff between
/// them. Each attempt gets a fresh transaction; a failed attempt rolls back
/// before the sleep.
///
/// # Errors
///
/// The unit's error once attempts are exhausted, or immediately when the
/// error is not transient.
pub async fn with_retry<F, T>(
    db: &DatabaseConnection,
    policy: RetryPolicy,
    unit: F,
) -> Result<T, RepoError>
where
    F: for<'c> Fn(
            &'c DatabaseTransaction,
        ) -> Pin<Box<dyn Future<Output = Result<T, RepoError>> + Send + 'c>>
        + Send
        + Sync,
    T: Send,
{
    let mut attempt = 0;
    loop {
        match db.transaction(|txn| unit(txn)).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let err = flatten(err);
                if attempt + 1 >= policy.max_attempts.max(1) || !is_transient(&err) {
                    return Err(err);
                }
                let delay = policy.backoff(attempt);
                tracing::debug!(
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "Retrying transaction after transient database error"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

fn flatten(err: TransactionError<RepoError>) -> RepoError {
    match err {
        TransactionError::Connection(db_err) => db_err.into(),
        TransactionError::Transaction(err) => err,
    }
}
