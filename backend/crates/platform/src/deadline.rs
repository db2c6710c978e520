//! Bounded waits for store operations
//!
//! Every persistence call runs under a deadline. A missed deadline is
//! surfaced to the caller as its own error type, which each bounded
//! context maps to a retryable "unavailable" error.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// The operation did not finish within its deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Operation timed out after {0:?}")]
pub struct DeadlineExceeded(pub Duration);

/// Await a fallible future, failing with `DeadlineExceeded` after `limit`
///
/// ## Examples
/// ```rust
/// # tokio_test::block_on(async {
/// use std::time::Duration;
/// use platform::deadline::{within, DeadlineExceeded};
///
/// let value: Result<u8, DeadlineExceeded> =
///     within(Duration::from_secs(1), async { Ok(7) }).await;
/// assert_eq!(value, Ok(7));
/// # });
/// ```
pub async fn within<F, T, E>(limit: Duration, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<DeadlineExceeded>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(DeadlineExceeded(limit).into()),
    }
}
