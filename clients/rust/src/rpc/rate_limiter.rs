//! Token bucket shared by every call `RpcConnection` makes.
//!
//! A session's traffic is bursty: each refresh issues a handful of account
//! reads, and a mint attempt polls its signature every few hundred
//! milliseconds. A rejected slot surfaces as `MintError::RateLimited`,
//! which reads retry after `retry_after_ms` and sends do not.

use crate::config::RateLimitConfig;
use crate::errors::MintError;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::Mutex;

type DirectLimiter = governor::RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

pub struct RpcRateLimiter {
    limiter: DirectLimiter,
    config: RateLimitConfig,
    /// Calls currently waiting in `acquire`.
    queue_size: Arc<Mutex<usize>>,
}

/// Proof that a slot was taken.
pub struct RateLimitGuard {
    _private: (),
}

impl RpcRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let rps = NonZeroU32::new(config.max_rps).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst_size).unwrap_or(rps);
        let limiter = governor::RateLimiter::direct(governor::Quota::per_second(rps).allow_burst(burst));

        Self {
            limiter,
            config,
            queue_size: Arc::new(Mutex::new(0)),
        }
    }

    /// No effective limit, for local validators.
    pub fn unlimited() -> Self {
        Self::new(RateLimitConfig {
            max_rps: u32::MAX,
            burst_size: u32::MAX,
            queue_on_limit: false,
            max_queue_depth: 0,
        })
    }

    /// Take a slot, waiting in the queue when one is not free.
    ///
    /// Returns `RateLimited` without waiting when queueing is disabled or
    /// `max_queue_depth` callers are already waiting.
    pub async fn acquire(&self) -> Result<RateLimitGuard, MintError> {
        if self.limiter.check().is_ok() {
            return Ok(RateLimitGuard { _private: () });
        }

        let mut queue_size = self.queue_size.lock().await;
        if !self.config.queue_on_limit || *queue_size >= self.config.max_queue_depth {
            return Err(MintError::RateLimited {
                retry_after_ms: self.estimated_wait_ms(),
            });
        }
        *queue_size += 1;
        drop(queue_size);

        self.limiter.until_ready().await;

        let mut queue_size = self.queue_size.lock().await;
        *queue_size = queue_size.saturating_sub(1);

        Ok(RateLimitGuard { _private: () })
    }

    /// Take a slot only if one is free now.
    pub fn try_acquire(&self) -> Option<RateLimitGuard> {
        self.limiter
            .check()
            .ok()
            .map(|_| RateLimitGuard { _private: () })
    }

    fn estimated_wait_ms(&self) -> u64 {
        1000 / self.config.max_rps.max(1) as u64
    }
}
