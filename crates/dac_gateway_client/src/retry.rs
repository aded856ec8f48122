use std::future::Future;
use std::time::Duration;

use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tracing::warn;

use crate::error::GatewayClientError;

/// Bounded exponential backoff applied around each gateway call (spec.md §4.5: "retries
/// on network/5xx classes with capped exponential backoff; 4xx responses are returned as
/// structural errors without retry"). Mirrors [`dac_storage::RetryPolicy`]'s shape.
#[derive(Clone, Copy, Debug)]
pub struct GatewayRetryPolicy {
    pub base_delay_millis: u64,
    pub max_delay_millis: u64,
    pub max_attempts: usize,
}

impl Default for GatewayRetryPolicy {
    fn default() -> Self {
        GatewayRetryPolicy { base_delay_millis: 50, max_delay_millis: 2_000, max_attempts: 4 }
    }
}

impl GatewayRetryPolicy {
    fn delays(&self) -> impl Iterator<Item = Duration> {
        let max_delay = self.max_delay_millis;
        ExponentialBackoff::from_millis(self.base_delay_millis.max(1))
            .max_delay(Duration::from_millis(max_delay))
            .map(jitter)
            .take(self.max_attempts.saturating_sub(1))
    }

    /// Runs `action` until it succeeds, returns a non-retryable error, or the retry
    /// budget named by `max_attempts` is exhausted. Stops immediately on a non-retryable
    /// error instead of burning through the remaining attempts.
    pub async fn run<T, F, Fut>(&self, action: F) -> Result<T, GatewayClientError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, GatewayClientError>>,
    {
        let mut delays = self.delays();
        loop {
            match action().await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => match delays.next() {
                    Some(delay) => {
                        warn!(error = %err, "retryable gateway error, retrying");
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(err),
                },
            }
        }
    }
}
