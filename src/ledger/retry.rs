//! Retry and timeout helpers for Ledger Data Port realizations
//!
//! Transient failures are retried a bounded number of times with a fixed
//! delay between attempts; non-retryable failures (not found, auth) pass
//! through immediately.

use crate::errors::{PortError, PortResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::warn;

/// Run a fallible port operation with bounded, fixed-delay retries.
///
/// Only failures for which [`PortError::is_retryable`] holds are attempted
/// again; the last error is returned once attempts are exhausted.
pub async fn with_retries<T, F, Fut>(
    max_retries: usize,
    delay: Duration,
    operation: &str,
    mut f: F,
) -> PortResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PortResult<T>>,
{
    let attempts = max_retries.max(1);
    let mut last_err = None;

    for attempt in 1..=attempts {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                warn!(
                    "{} failed (attempt {}/{}): {}",
                    operation, attempt, attempts, e
                );
                last_err = Some(e);
                if attempt < attempts {
                    sleep(delay).await;
                }
            }
        }
    }

    Err(last_err.unwrap_or_else(|| PortError::Unknown(format!("{}: no attempts ran", operation))))
}

/// Execute a blocking call on the blocking pool with a timeout, flattening
/// the timeout and join layers into the port error taxonomy.
pub async fn execute_blocking_with_timeout<T, F>(
    timeout_seconds: u64,
    operation: &str,
    f: F,
) -> PortResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> PortResult<T> + Send + 'static,
{
    match timeout(
        Duration::from_secs(timeout_seconds),
        tokio::task::spawn_blocking(f),
    )
    .await
    {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(PortError::Unknown(format!(
            "{}: task execution error: {}",
            operation, join_err
        ))),
        Err(_) => Err(PortError::Transient(format!(
            "{}: timed out after {}s",
            operation, timeout_seconds
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let result: PortResult<u32> =
            with_retries(3, Duration::from_millis(1), "op", move || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(PortError::Transient("flaky".to_string()))
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let result: PortResult<u32> =
            with_retries(5, Duration::from_millis(1), "op", move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(PortError::NotFound {
                        txid: "ab".repeat(32),
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(PortError::NotFound { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let result: PortResult<u32> = with_retries(2, Duration::from_millis(1), "op", || async {
            Err(PortError::Transient("down".to_string()))
        })
        .await;

        match result {
            Err(PortError::Transient(msg)) => assert_eq!(msg, "down"),
            other => panic!("expected transient, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_blocking_timeout_maps_to_transient() {
        let result: PortResult<()> =
            execute_blocking_with_timeout(0, "slow_op", || {
                std::thread::sleep(Duration::from_millis(200));
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(PortError::Transient(_))));
    }

    #[tokio::test]
    async fn test_blocking_success_passes_through() {
        let result = execute_blocking_with_timeout(5, "fast_op", || Ok(41u32)).await;
        assert_eq!(result.unwrap(), 41);
    }
}
