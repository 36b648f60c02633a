//! Retry with exponential backoff for idempotent external calls.
//!
//! Used for ledger queries, account loads, extraction and pinning uploads.
//! Never used for transaction submission or signing: resubmitting after an
//! ambiguous outcome can anchor the same facts twice.

use std::future::Future;
use std::time::Duration;

/// Maximum number of retry attempts after the initial call.
pub const MAX_RETRIES: u32 = 3;

/// Base delay between retries (doubles each attempt: 200ms, 400ms, 800ms).
pub const BASE_DELAY_MS: u64 = 200;

/// Run `f` until it succeeds, returns a non-retryable error, or the retry
/// budget is spent.
///
/// `is_retryable` decides which errors are transient. The last error is
/// returned unchanged.
pub async fn retry_send<T, E, F, Fut>(
    operation: &'static str,
    is_retryable: impl Fn(&E) -> bool,
    f: F,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    for attempt in 0..MAX_RETRIES {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if is_retryable(&e) => {
                let delay = Duration::from_millis(BASE_DELAY_MS * 2u64.pow(attempt));
                tracing::warn!(
                    operation,
                    attempt = attempt + 1,
                    max_retries = MAX_RETRIES,
                    "request failed, retrying in {delay:?}: {e}"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
    f().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn exhausts_all_attempts_on_transient_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result: Result<(), String> = retry_send("test", |_| true, || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err("connection refused".to_string())
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_RETRIES + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_non_retryable_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result: Result<(), String> = retry_send("test", |_| false, || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err("not found".to_string())
            }
        })
        .await;
        assert_eq!(result.unwrap_err(), "not found");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn returns_first_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result: Result<u32, String> = retry_send("test", |_| true, || {
            let c = c.clone();
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err("timeout".to_string())
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
    }
}
