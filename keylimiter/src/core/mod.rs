//! Core components of the keylimiter library
//!
//! This module contains the fundamental building blocks:
//! - [`clock`]: Injectable time sources
//! - [`store`]: Self-expiring storage for per-key state
//! - [`limiter`]: The [`KeyLimiter`] contract
//! - [`token_bucket`]: Continuous refill token bucket
//! - [`sliding_window`]: Sliding window counter

pub mod clock;
pub mod limiter;
pub mod sliding_window;
pub mod store;
pub mod token_bucket;

pub use clock::{Clock, ManualClock, MonotonicClock, SystemClock};
pub use limiter::{KeyLimiter, RateLimitResult};
pub use sliding_window::{SlidingWindowBuilder, SlidingWindowLimiter, WindowUnit};
pub use store::{KeyValueStore, Namespace, Namespaced, TtlStore};
pub use token_bucket::{TokenBucketBuilder, TokenBucketLimiter};

/// Errors raised while constructing a limiter
///
/// Limiter operations themselves never fail; throttling is reported through
/// their return values. Invalid parameters are rejected up front instead.
///
/// # Example
///
/// ```
/// use keylimiter::{LimiterError, TokenBucketLimiter};
///
/// match TokenBucketLimiter::new(0, 1.0) {
///     Err(LimiterError::InvalidBucketSize) => {}
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LimiterError {
    #[error("bucket size must be a positive integer")]
    InvalidBucketSize,

    #[error("refill rate must be a finite, non-negative number of tokens per second: {0}")]
    InvalidRefillRate(f64),

    #[error("max requests must be a positive integer")]
    InvalidMaxRequests,

    #[error("unknown window unit: {0} (expected second, minute or hour)")]
    UnknownWindowUnit(String),
}
