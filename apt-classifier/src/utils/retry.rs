//! Persistence Retry Logic
//!
//! Exponential backoff for store failures. Every persistence error is
//! retried up to the attempt limit; other errors are returned immediately.
//!
//! **Backoff Strategy:**
//! - Initial delay: 10ms
//! - Max delay: 1000ms
//! - Multiplier: 2.0 (exponential)

use std::time::{Duration, Instant};

use crate::error::ClassifyResult;

const INITIAL_BACKOFF_MS: u64 = 10;
const MAX_BACKOFF_MS: u64 = 1000;

/// Retry an operation up to `max_attempts` times while it fails with a
/// retryable error.
///
/// # Arguments
/// * `operation_name` - Name for logging (e.g., "profile persist")
/// * `max_attempts` - Total attempts including the first (minimum 1)
/// * `operation` - Async closure performing the store operation
///
/// # Returns
/// Result from the operation, or the last error once attempts are exhausted
pub async fn retry_with_backoff<F, Fut, T>(
    operation_name: &str,
    max_attempts: u32,
    mut operation: F,
) -> ClassifyResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = ClassifyResult<T>>,
{
    let max_attempts = max_attempts.max(1);
    let start_time = Instant::now();
    let mut attempt = 0;
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Store operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) if attempt >= max_attempts => {
                tracing::error!(
                    operation = operation_name,
                    attempt,
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    error = %err,
                    "Store operation failed: retries exhausted"
                );
                return Err(err);
            }
            Err(err) => {
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms,
                    transient = err.is_transient(),
                    error = %err,
                    "Store error, will retry after backoff"
                );

                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClassifyError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn locked() -> ClassifyError {
        ClassifyError::Persistence(apt_common::Error::Database(sqlx::Error::PoolTimedOut))
    }

    #[tokio::test]
    async fn test_retry_succeeds_first_attempt() {
        let result = retry_with_backoff("test_op", 3, || async { Ok::<i32, ClassifyError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_errors() {
        let attempts = AtomicU32::new(0);

        let result = retry_with_backoff("test_op", 4, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(locked())
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let attempts = AtomicU32::new(0);

        let result = retry_with_backoff("test_op", 3, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, ClassifyError>(locked()) }
        })
        .await;

        assert!(result.unwrap_err().is_retryable());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_transient_store_error_still_retries() {
        let attempts = AtomicU32::new(0);

        let result = retry_with_backoff("test_op", 3, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                Err::<i32, ClassifyError>(
                    apt_common::Error::Database(sqlx::Error::RowNotFound).into(),
                )
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_store_error_fails_immediately() {
        let attempts = AtomicU32::new(0);

        let result = retry_with_backoff("test_op", 5, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, ClassifyError>(ClassifyError::Validation("bad".to_string())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
