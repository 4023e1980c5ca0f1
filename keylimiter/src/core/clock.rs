//! Time sources for the limiters
//!
//! Limiters never read a global clock. Every instance is handed a [`Clock`]
//! at construction and asks it for the current time, expressed as seconds in
//! an `f64`. The production default is [`MonotonicClock`]; tests drive a
//! [`ManualClock`] forward explicitly.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// A source of the current time in seconds
///
/// Values returned to a single limiter should be non-decreasing. Any
/// `Fn() -> f64 + Send + Sync` closure is a clock:
///
/// ```
/// use keylimiter::{Clock, TokenBucketLimiter};
///
/// let frozen = || 42.0;
/// assert_eq!(frozen.now(), 42.0);
///
/// let _limiter = TokenBucketLimiter::builder(3, 1.0).clock(frozen).build().unwrap();
/// ```
pub trait Clock: Send + Sync {
    /// Current time in seconds
    fn now(&self) -> f64;
}

impl<F> Clock for F
where
    F: Fn() -> f64 + Send + Sync,
{
    fn now(&self) -> f64 {
        self()
    }
}

/// Seconds elapsed since the clock was created, read from [`Instant`]
///
/// Window boundaries of a sliding window limiter driven by this clock are
/// aligned to the moment the clock was created, not to wall-clock minutes.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Seconds since the Unix epoch
///
/// Use this when windows should line up with wall-clock seconds, minutes and
/// hours. It is not monotonic: a system clock step backwards makes recorded
/// state look like it belongs to the future until time catches up.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// A clock that only moves when told to
///
/// Clones share the same time, so a test can keep one handle and give
/// another to the limiter under test.
///
/// ```
/// use keylimiter::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// let handle = clock.clone();
///
/// handle.advance(1.5);
/// assert_eq!(clock.now(), 1.5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<f64>>,
}

impl ManualClock {
    /// Create a clock starting at zero
    pub fn new() -> Self {
        Self::starting_at(0.0)
    }

    /// Create a clock starting at `seconds`
    pub fn starting_at(seconds: f64) -> Self {
        ManualClock {
            now: Arc::new(Mutex::new(seconds)),
        }
    }

    /// Move the clock forward by `seconds`
    pub fn advance(&self, seconds: f64) {
        *self.now.lock() += seconds;
    }

    /// Jump the clock to `seconds`
    pub fn set(&self, seconds: f64) {
        *self.now.lock() = seconds;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock()
    }
}
