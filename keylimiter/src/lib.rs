//! # keylimiter
//!
//! Per-key rate limiters for Rust: a continuous refill token bucket and a
//! sliding window counter, both keeping their state in a self-expiring store.
//!
//! ## Overview
//!
//! Every limiter tracks an independent budget per string key (an IP address,
//! an API key, a user id) and answers four questions about it:
//! - **`allow`**: admit one call now, consuming capacity if admitted
//! - **`limit`**: the configured maximum
//! - **`remaining`**: calls left before being throttled
//! - **`retry_after`**: whole seconds to wait before the next admission
//!
//! State for idle keys expires on its own, so memory stays bounded by the
//! number of recently active keys.
//!
//! ## Quick Start
//!
//! ```
//! use keylimiter::{KeyLimiter, TokenBucketLimiter};
//!
//! // Bursts of 10, refilling 2 tokens per second
//! let limiter = TokenBucketLimiter::new(10, 2.0)?;
//!
//! if limiter.allow("user:123") {
//!     println!("Request allowed! Remaining: {}", limiter.remaining("user:123"));
//! } else {
//!     println!("Rate limited! Retry after: {} seconds", limiter.retry_after("user:123"));
//! }
//! # Ok::<(), keylimiter::LimiterError>(())
//! ```
//!
//! ## Limiters
//!
//! ### [`TokenBucketLimiter`]
//! Allows bursts up to the bucket size, then one call per token regenerated.
//!
//! ```
//! use keylimiter::{KeyLimiter, TokenBucketLimiter};
//!
//! // Password reset attempts: 3 at once, then one every 20 minutes
//! let limiter = TokenBucketLimiter::new(3, 1.0 / 1200.0)?;
//! assert!(limiter.allow("password_reset:user:456"));
//! # Ok::<(), keylimiter::LimiterError>(())
//! ```
//!
//! ### [`SlidingWindowLimiter`]
//! Caps calls in any rolling second, minute or hour.
//!
//! ```
//! use keylimiter::{KeyLimiter, SlidingWindowLimiter, WindowUnit};
//!
//! // Limit each API key to 1000 requests per minute
//! let limiter = SlidingWindowLimiter::new(1000, WindowUnit::Minute)?;
//! let result = limiter.check("api_key_12345");
//! assert!(result.allowed);
//! assert_eq!(result.remaining, 999);
//! # Ok::<(), keylimiter::LimiterError>(())
//! ```
//!
//! ## Time
//!
//! Limiters read time from a [`Clock`]. The default [`MonotonicClock`] is
//! immune to wall clock adjustments; [`ManualClock`] makes tests
//! deterministic:
//!
//! ```
//! use keylimiter::{KeyLimiter, ManualClock, TokenBucketLimiter};
//!
//! let clock = ManualClock::new();
//! let limiter = TokenBucketLimiter::builder(1, 1.0)
//!     .clock(clock.clone())
//!     .build()?;
//!
//! assert!(limiter.allow("key"));
//! assert!(!limiter.allow("key"));
//! clock.advance(1.0);
//! assert!(limiter.allow("key"));
//! # Ok::<(), keylimiter::LimiterError>(())
//! ```
//!
//! ## Thread Safety
//!
//! Limiters are `Send + Sync` and serialize each operation internally. Share
//! one instance through an [`Arc`](std::sync::Arc):
//!
//! ```
//! use keylimiter::{KeyLimiter, SlidingWindowLimiter, WindowUnit};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let limiter = Arc::new(SlidingWindowLimiter::new(100, WindowUnit::Second)?);
//!
//! let handles: Vec<_> = (0..4)
//!     .map(|_| {
//!         let limiter = Arc::clone(&limiter);
//!         thread::spawn(move || limiter.allow("shared"))
//!     })
//!     .collect();
//! for handle in handles {
//!     assert!(handle.join().unwrap());
//! }
//! # Ok::<(), keylimiter::LimiterError>(())
//! ```
//!
//! ## Features
//!
//! - `ahash` (default): Use AHash for faster hashing

pub mod core;

pub use core::{
    Clock, KeyLimiter, KeyValueStore, LimiterError, ManualClock, MonotonicClock, Namespace,
    Namespaced, RateLimitResult, SlidingWindowBuilder, SlidingWindowLimiter, SystemClock,
    TokenBucketBuilder, TokenBucketLimiter, TtlStore, WindowUnit,
};

// Re-export the store module so benchmarks can access it
pub use crate::core::store;
