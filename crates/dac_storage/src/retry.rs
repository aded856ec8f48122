use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::warn;

use crate::error::StorageError;

/// Bounded exponential backoff for transient storage faults. Mirrors the
/// `retry_base_millis` / `retry_max_delay_millis` / `max_retries` shape the reference
/// workspace uses for its upstream HTTP `RetryConfig`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay_millis: u64,
    pub max_delay_millis: u64,
    pub max_attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy { base_delay_millis: 20, max_delay_millis: 2_000, max_attempts: 5 }
    }
}

impl RetryPolicy {
    fn strategy(&self) -> impl Iterator<Item = Duration> {
        let max_delay = self.max_delay_millis;
        ExponentialBackoff::from_millis(self.base_delay_millis.max(1))
            .max_delay(Duration::from_millis(max_delay))
            .map(jitter)
            .take(self.max_attempts.saturating_sub(1))
    }

    /// Runs `action` until it succeeds, returns a non-transient error, or the retry
    /// budget is exhausted (in which case the last transient error is surfaced as
    /// [`StorageError::Unavailable`]).
    pub async fn run<T, F, Fut>(&self, mut action: F) -> Result<T, StorageError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StorageError>>,
    {
        let mut last_transient: Option<String> = None;
        let outcome = Retry::spawn(self.strategy(), || {
            let fut = action();
            async {
                match fut.await {
                    Ok(value) => Ok(value),
                    Err(StorageError::Transient(msg)) => {
                        warn!("transient storage fault, will retry: {msg}");
                        Err(msg)
                    }
                    Err(other) => {
                        // tokio-retry only retries on Err; smuggle non-retryable errors
                        // out via a sentinel prefix and re-raise them below.
                        Err(format!("\u{0}non-transient\u{0}{other}"))
                    }
                }
            }
        })
        .await;

        match outcome {
            Ok(value) => Ok(value),
            Err(msg) => {
                if let Some(rest) = msg.strip_prefix("\u{0}non-transient\u{0}") {
                    Err(StorageError::Backend(rest.to_string()))
                } else {
                    last_transient = Some(msg.clone());
                    Err(StorageError::Unavailable(last_transient.unwrap_or(msg)))
                }
            }
        }
    }
}
