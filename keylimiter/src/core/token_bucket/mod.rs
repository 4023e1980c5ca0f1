//! Token bucket limiter
//!
//! Each key owns a bucket of up to `bucket_size` tokens that refills
//! continuously at `refill_rate` tokens per second. An admitted call takes one
//! token; a call finding the bucket empty is throttled.

use super::LimiterError;
use super::clock::{Clock, MonotonicClock};
use super::limiter::{KeyLimiter, RateLimitResult};
use super::store::{KeyValueStore, Namespace, TtlStore};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, trace};


const DEFAULT_CAPACITY: usize = 1000;
const BUCKET_NAMESPACE: &str = "bucket";

#[derive(Debug, Clone, Copy, PartialEq)]
struct Bucket {
    tokens: u64,
    last_seen: f64,
}

/// Per-key token bucket rate limiter
///
/// # Example
///
/// ```
/// use keylimiter::{KeyLimiter, ManualClock, TokenBucketLimiter};
///
/// let clock = ManualClock::new();
/// let limiter = TokenBucketLimiter::builder(3, 1.0)
///     .clock(clock.clone())
///     .build()?;
///
/// assert!(limiter.allow("127.0.0.1"));
/// assert!(limiter.allow("127.0.0.1"));
/// assert!(limiter.allow("127.0.0.1"));
/// assert!(!limiter.allow("127.0.0.1"));
/// assert_eq!(limiter.retry_after("127.0.0.1"), 1);
///
/// clock.advance(1.0);
/// assert_eq!(limiter.remaining("127.0.0.1"), 1);
/// # Ok::<(), keylimiter::LimiterError>(())
/// ```
pub struct TokenBucketLimiter {
    bucket_size: u64,
    refill_rate: f64,
    clock: Arc<dyn Clock>,
    buckets: Namespace,
    store: Mutex<TtlStore<Bucket>>,
}

/// Builder for configuring a TokenBucketLimiter
///
/// # Example
///
/// ```
/// use keylimiter::{SystemClock, TokenBucketLimiter};
///
/// let limiter = TokenBucketLimiter::builder(50, 10.0)
///     .clock(SystemClock)
///     .capacity(100_000)
///     .build()
///     .unwrap();
/// ```
pub struct TokenBucketBuilder {
    bucket_size: u64,
    refill_rate: f64,
    clock: Option<Arc<dyn Clock>>,
    capacity: usize,
}

impl TokenBucketLimiter {
    /// Create a limiter driven by a [`MonotonicClock`]
    ///
    /// # Errors
    ///
    /// - [`LimiterError::InvalidBucketSize`]: `bucket_size` is zero
    /// - [`LimiterError::InvalidRefillRate`]: `refill_rate` is negative, NaN or infinite
    pub fn new(bucket_size: u64, refill_rate: f64) -> Result<Self, LimiterError> {
        Self::builder(bucket_size, refill_rate).build()
    }

    /// Create a new builder for configuring a TokenBucketLimiter
    pub fn builder(bucket_size: u64, refill_rate: f64) -> TokenBucketBuilder {
        TokenBucketBuilder {
            bucket_size,
            refill_rate,
            clock: None,
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// Maximum number of tokens a bucket holds
    pub fn bucket_size(&self) -> u64 {
        self.bucket_size
    }

    /// Tokens added per second
    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    // Longest time a bucket needs to refill from empty. A bucket left alone
    // this long is full again, which is what an absent bucket means, so state
    // need not outlive it.
    fn state_ttl(bucket_size: u64, refill_rate: f64) -> f64 {
        if refill_rate == 0.0 {
            f64::INFINITY
        } else {
            (bucket_size as f64 / refill_rate).ceil()
        }
    }

    // Time for a single token to regenerate, not the time left until the
    // next one: partial progress is ignored, so this never admits early.
    fn token_period(&self) -> u64 {
        if self.refill_rate == 0.0 {
            u64::MAX
        } else {
            (1.0 / self.refill_rate).ceil() as u64
        }
    }

    /// Bring the bucket for `key` up to date and return its token count
    fn refill(&self, store: &mut TtlStore<Bucket>, key: &str, now: f64) -> u64 {
        let mut buckets = self.buckets.view(store);

        let Some(bucket) = buckets.get(key) else {
            buckets.set(
                key,
                Bucket {
                    tokens: self.bucket_size,
                    last_seen: now,
                },
            );
            return self.bucket_size;
        };

        // Progress below one whole token is dropped rather than carried over
        let new_tokens = ((now - bucket.last_seen) * self.refill_rate).floor();
        if new_tokens <= 0.0 {
            return bucket.tokens;
        }

        let tokens = bucket
            .tokens
            .saturating_add(new_tokens as u64)
            .min(self.bucket_size);
        buckets.set(
            key,
            Bucket {
                tokens,
                last_seen: now,
            },
        );
        tokens
    }

    fn take(&self, store: &mut TtlStore<Bucket>, key: &str, now: f64) -> Option<u64> {
        let tokens = self.refill(store, key, now);
        if tokens == 0 {
            trace!(key, "token bucket empty");
            return None;
        }

        let left = tokens - 1;
        self.buckets.view(store).set(
            key,
            Bucket {
                tokens: left,
                last_seen: now,
            },
        );
        Some(left)
    }

    fn retry_after_for(&self, tokens: u64) -> u64 {
        if tokens > 0 { 0 } else { self.token_period() }
    }
}

impl KeyLimiter for TokenBucketLimiter {
    fn allow(&self, key: &str) -> bool {
        let mut store = self.store.lock();
        let now = self.clock.now();
        self.take(&mut store, key, now).is_some()
    }

    fn limit(&self, _key: &str) -> u64 {
        self.bucket_size
    }

    fn remaining(&self, key: &str) -> u64 {
        let mut store = self.store.lock();
        let now = self.clock.now();
        self.refill(&mut store, key, now)
    }

    fn retry_after(&self, key: &str) -> u64 {
        let mut store = self.store.lock();
        let now = self.clock.now();
        let tokens = self.refill(&mut store, key, now);
        self.retry_after_for(tokens)
    }

    fn check(&self, key: &str) -> RateLimitResult {
        let mut store = self.store.lock();
        let now = self.clock.now();

        let (allowed, remaining) = match self.take(&mut store, key, now) {
            Some(left) => (true, left),
            None => (false, 0),
        };

        RateLimitResult {
            allowed,
            limit: self.bucket_size,
            remaining,
            retry_after: self.retry_after_for(remaining),
        }
    }
}

impl TokenBucketBuilder {
    /// Set the time source (defaults to a fresh [`MonotonicClock`])
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Set the expected number of distinct keys to preallocate for
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Validate the parameters and build the limiter
    pub fn build(self) -> Result<TokenBucketLimiter, LimiterError> {
        if self.bucket_size == 0 {
            return Err(LimiterError::InvalidBucketSize);
        }
        if !self.refill_rate.is_finite() || self.refill_rate < 0.0 {
            return Err(LimiterError::InvalidRefillRate(self.refill_rate));
        }

        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(MonotonicClock::new()),
        };
        let ttl = TokenBucketLimiter::state_ttl(self.bucket_size, self.refill_rate);

        debug!(
            bucket_size = self.bucket_size,
            refill_rate = self.refill_rate,
            ttl,
            "token bucket limiter created"
        );

        Ok(TokenBucketLimiter {
            bucket_size: self.bucket_size,
            refill_rate: self.refill_rate,
            store: Mutex::new(TtlStore::with_shared_clock(
                ttl,
                Arc::clone(&clock),
                self.capacity,
            )),
            clock,
            buckets: Namespace::new(BUCKET_NAMESPACE),
        })
    }
}
