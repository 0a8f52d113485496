use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Distinguishes transient failures worth another attempt from permanent ones.
#[derive(Debug)]
pub enum RetryError {
    /// Timeouts, connection failures, 429 and 5xx responses
    Retryable(anyhow::Error),
    /// Client errors and malformed payloads
    NonRetryable(anyhow::Error),
}

impl RetryError {
    pub fn into_inner(self) -> anyhow::Error {
        match self {
            RetryError::Retryable(err) | RetryError::NonRetryable(err) => err,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Attempts after the first one.
    max_retries: u32,
    /// Base delay for exponential backoff.
    base_delay_ms: u64,
    /// Jitter as a fraction of the delay, e.g. 0.25 = ±25%.
    jitter_factor: f64,
}

impl RetryConfig {
    pub fn new(max_retries: u32, base_delay_ms: u64) -> Self {
        RetryConfig {
            max_retries,
            base_delay_ms,
            ..Default::default()
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_retries: 1,
            base_delay_ms: 500,
            jitter_factor: 0.25,
        }
    }
}

pub async fn with_retry<F, Fut, T>(func: F, config: &RetryConfig) -> Result<T, RetryError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, RetryError>>,
{
    let mut attempt = 0;
    loop {
        match func().await {
            Ok(result) => return Ok(result),
            Err(RetryError::Retryable(err)) if attempt < config.max_retries => {
                log::warn!("Retryable error: {}", err);
                let delay = backoff_with_jitter(attempt, config);
                log::warn!(
                    "Retry attempt {}/{} after {:?}",
                    attempt + 1,
                    config.max_retries,
                    delay
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Exponential backoff (base_delay * 2^attempt) with ±jitter_factor noise.
fn backoff_with_jitter(attempt: u32, config: &RetryConfig) -> Duration {
    let base_delay = config
        .base_delay_ms
        .saturating_mul(2u64.saturating_pow(attempt))
        .min(i64::MAX as u64 / 2);
    let jitter_range = (base_delay as f64 * config.jitter_factor) as u64;
    let jitter = rand::rng().random_range(0..=jitter_range * 2) as i64 - jitter_range as i64;
    let delay_ms = (base_delay as i64 + jitter).max(0) as u64;
    Duration::from_millis(delay_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_stays_within_jitter() {
        let config = RetryConfig::new(3, 1000);
        for attempt in 0..3 {
            let base = 1000 * 2u64.pow(attempt);
            let delay = backoff_with_jitter(attempt, &config).as_millis() as u64;
            assert!(delay >= base - base / 4 && delay <= base + base / 4);
        }
    }

    #[tokio::test]
    async fn test_retries_transient_failure_once() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = with_retry(
            move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(RetryError::Retryable(anyhow::anyhow!("timeout")))
                } else {
                    Ok(42)
                }
            },
            &RetryConfig::new(1, 1),
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = with_retry(
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RetryError::Retryable(anyhow::anyhow!("503")))
            },
            &RetryConfig::new(1, 1),
        )
        .await;

        assert!(matches!(result, Err(RetryError::Retryable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_is_not_repeated() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = with_retry(
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RetryError::NonRetryable(anyhow::anyhow!("401")))
            },
            &RetryConfig::new(3, 1),
        )
        .await;

        assert!(matches!(result, Err(RetryError::NonRetryable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
