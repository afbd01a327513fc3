//! RPC plumbing: the connection seam plus rate limiting and read retries.
//!
//! - `ChainConnection` - what the reader and engine need from a node
//! - `RpcConnection` - the production implementation over `RpcClient`
//! - `RpcRateLimiter` - token bucket rate limiting for RPC requests
//! - `RetryExecutor` - exponential backoff for idempotent reads

pub mod connection;
pub mod rate_limiter;
pub mod retry;

pub use connection::{ChainConnection, RpcConnection, SignatureState};
pub use rate_limiter::{RateLimitGuard, RpcRateLimiter};
pub use retry::RetryExecutor;
