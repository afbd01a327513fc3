//! Backoff for the connection's read path.
//!
//! `RpcConnection` runs account, balance, blockhash, rent and signature
//! status reads through [`RetryExecutor::execute`]. `send_transaction` does
//! not: a send that timed out may still land, and resending could mint twice.

use crate::config::RetryConfig;
use crate::errors::MintError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Single attempt, for callers that surface the first failure.
    pub fn no_retry() -> Self {
        Self::new(RetryConfig {
            max_retries: 0,
            initial_delay_ms: 0,
            max_delay_ms: 0,
            backoff_multiplier: 1.0,
        })
    }

    /// Run `operation`, retrying network errors up to `max_retries` times.
    ///
    /// A `RateLimited` hint raises the next delay to at least
    /// `retry_after_ms`. Decode, config and program errors return at once.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T, MintError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, MintError>>,
    {
        let mut attempts = 0;
        let mut delay = self.config.initial_delay_ms;

        loop {
            attempts += 1;

            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !e.is_retryable() || attempts > self.config.max_retries {
                        return Err(e);
                    }

                    if let Some(hint) = e.retry_hint_ms() {
                        delay = delay.max(hint);
                    }
                    let wait_time = delay + jitter(delay);

                    tracing::warn!(
                        attempts = attempts,
                        delay_ms = wait_time,
                        error = %e,
                        "RPC read failed, retrying"
                    );

                    sleep(Duration::from_millis(wait_time)).await;

                    delay = ((delay as f64) * self.config.backoff_multiplier) as u64;
                    delay = delay.min(self.config.max_delay_ms);
                }
            }
        }
    }
}

/// 0-25% of `delay`, derived from the clock's sub-second nanos.
fn jitter(delay: u64) -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);

    let max_jitter = delay / 4;
    if max_jitter == 0 {
        0
    } else {
        (nanos as u64) % max_jitter
    }
}
