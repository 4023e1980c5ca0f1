//! The contract shared by every limiter
//!
//! [`KeyLimiter`] is implemented by [`TokenBucketLimiter`] and
//! [`SlidingWindowLimiter`]. Both serialize every operation behind a single
//! per-instance lock, so one instance can be shared across threads through an
//! [`Arc`].
//!
//! [`TokenBucketLimiter`]: crate::TokenBucketLimiter
//! [`SlidingWindowLimiter`]: crate::SlidingWindowLimiter

use std::sync::Arc;
use std::time::Duration;

/// Outcome of a single admission attempt
///
/// All fields are read under the same lock as the admission itself, so they
/// describe the state right after this call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    /// Whether the call was admitted
    pub allowed: bool,
    /// The configured maximum calls per window or bucket
    pub limit: u64,
    /// Calls left before the next attempt would be throttled
    pub remaining: u64,
    /// Seconds to wait before retrying (0 if `remaining > 0`)
    pub retry_after: u64,
}

impl RateLimitResult {
    /// [`retry_after`](Self::retry_after) as a [`Duration`]
    pub fn retry_after_duration(&self) -> Duration {
        Duration::from_secs(self.retry_after)
    }
}

/// A per-key rate limiter
///
/// Only [`allow`](KeyLimiter::allow) and [`check`](KeyLimiter::check) consume
/// capacity. Calling `limit`, `remaining` or `retry_after` any number of times
/// never changes what a later `allow` returns.
///
/// # Example
///
/// ```
/// use keylimiter::{KeyLimiter, SlidingWindowLimiter, TokenBucketLimiter, WindowUnit};
/// use std::sync::Arc;
///
/// let burst: Arc<dyn KeyLimiter> = Arc::new(TokenBucketLimiter::new(10, 2.0)?);
/// let sustained: Arc<dyn KeyLimiter> =
///     Arc::new(SlidingWindowLimiter::new(100, WindowUnit::Minute)?);
///
/// let admitted = [burst, sustained]
///     .iter()
///     .all(|limiter| limiter.allow("10.0.0.1"));
/// assert!(admitted);
/// # Ok::<(), keylimiter::LimiterError>(())
/// ```
pub trait KeyLimiter: Send + Sync {
    /// Try to admit one call for `key`
    ///
    /// Returns `true` and consumes one unit of capacity if admitted.
    fn allow(&self, key: &str) -> bool;

    /// How many calls are allowed for `key` per window or bucket
    fn limit(&self, key: &str) -> u64;

    /// Calls left for `key` before being throttled
    ///
    /// When this returns a positive number, the next `allow` for the same key
    /// succeeds unless another thread gets there first.
    fn remaining(&self, key: &str) -> u64;

    /// Seconds to wait before `key` can be admitted again, rounded up
    ///
    /// Returns 0 while `remaining(key) > 0`.
    fn retry_after(&self, key: &str) -> u64;

    /// Try to admit one call and report the resulting state atomically
    fn check(&self, key: &str) -> RateLimitResult;
}

impl<L: KeyLimiter + ?Sized> KeyLimiter for &L {
    fn allow(&self, key: &str) -> bool {
        (**self).allow(key)
    }

    fn limit(&self, key: &str) -> u64 {
        (**self).limit(key)
    }

    fn remaining(&self, key: &str) -> u64 {
        (**self).remaining(key)
    }

    fn retry_after(&self, key: &str) -> u64 {
        (**self).retry_after(key)
    }

    fn check(&self, key: &str) -> RateLimitResult {
        (**self).check(key)
    }
}

impl<L: KeyLimiter + ?Sized> KeyLimiter for Box<L> {
    fn allow(&self, key: &str) -> bool {
        (**self).allow(key)
    }

    fn limit(&self, key: &str) -> u64 {
        (**self).limit(key)
    }

    fn remaining(&self, key: &str) -> u64 {
        (**self).remaining(key)
    }

    fn retry_after(&self, key: &str) -> u64 {
        (**self).retry_after(key)
    }

    fn check(&self, key: &str) -> RateLimitResult {
        (**self).check(key)
    }
}

impl<L: KeyLimiter + ?Sized> KeyLimiter for Arc<L> {
    fn allow(&self, key: &str) -> bool {
        (**self).allow(key)
    }

    fn limit(&self, key: &str) -> u64 {
        (**self).limit(key)
    }

    fn remaining(&self, key: &str) -> u64 {
        (**self).remaining(key)
    }

    fn retry_after(&self, key: &str) -> u64 {
        (**self).retry_after(key)
    }

    fn check(&self, key: &str) -> RateLimitResult {
        (**self).check(key)
    }
}
