use crate::types::network::Network;
use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Exponential backoff settings for one call site. BASE runs hotter against
/// public RPC endpoints than the other networks, so it gets a wider envelope.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

pub const DEFAULT_POLICY: RetryPolicy = RetryPolicy {
    max_retries: 3,
    initial_delay: Duration::from_millis(1000),
    max_delay: Duration::from_millis(10_000),
    multiplier: 2.0,
};

pub const BASE_POLICY: RetryPolicy = RetryPolicy {
    max_retries: 5,
    initial_delay: Duration::from_millis(2500),
    max_delay: Duration::from_millis(20_000),
    multiplier: 2.5,
};

impl RetryPolicy {
    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Base => BASE_POLICY,
            _ => DEFAULT_POLICY,
        }
    }
}

const RETRYABLE_MARKERS: [&str; 6] = [
    "429",
    "rate limit",
    "too many requests",
    "econnreset",
    "etimedout",
    "enotfound",
];

pub fn is_retryable(err: &anyhow::Error) -> bool {
    let text = format!("{err:#}").to_lowercase();
    RETRYABLE_MARKERS.iter().any(|marker| text.contains(marker))
}

/// Runs `op` until it succeeds, the error is not a transport throttle, or the
/// retry budget is spent. The last error is surfaced verbatim.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delay = policy.initial_delay;
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt > policy.max_retries || !is_retryable(&err) {
                    return Err(err);
                }
                warn!(
                    "{label}: attempt {attempt}/{} failed, retrying in {:?}: {err:#}",
                    policy.max_retries, delay
                );
                tokio::time::sleep(delay).await;
                delay = Duration::from_secs_f64(
                    (delay.as_secs_f64() * policy.multiplier).min(policy.max_delay.as_secs_f64()),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_two_throttles() {
        let calls = AtomicU32::new(0);
        let result = with_retry(DEFAULT_POLICY, "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(anyhow!("HTTP 429 Too Many Requests"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_budget_and_surfaces_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(DEFAULT_POLICY, "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(anyhow!("HTTP 429 on attempt {n}")) }
        })
        .await;
        // 1 initial attempt + 3 retries
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(result.unwrap_err().to_string().contains("attempt 3"));
    }

    #[tokio::test]
    async fn non_retryable_propagates_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(DEFAULT_POLICY, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(anyhow!("execution reverted")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn retryable_matcher_is_case_insensitive() {
        assert!(is_retryable(&anyhow!("Rate Limit exceeded")));
        assert!(is_retryable(&anyhow!("read ECONNRESET")));
        assert!(is_retryable(&anyhow!("getaddrinfo ENOTFOUND host")));
        assert!(!is_retryable(&anyhow!("insufficient funds")));
    }
}
