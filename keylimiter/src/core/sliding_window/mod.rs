//! Sliding window counter limiter
//!
//! Time is cut into fixed windows of one second, minute or hour. Each key
//! counts its calls in the current window and remembers the count of the
//! window before it. The rolling count weighs the previous window by the share
//! of it still covered by a window-sized span ending now:
//!
//! ```text
//! rolling = floor(current + previous * (interval - elapsed) / interval)
//! ```
//!
//! where `elapsed` is the time already spent in the current window.

use super::LimiterError;
use super::clock::{Clock, MonotonicClock};
use super::limiter::{KeyLimiter, RateLimitResult};
use super::store::{KeyValueStore, Namespace, TtlStore};
use parking_lot::Mutex;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, trace};

#[cfg(test)]
mod tests;

const DEFAULT_CAPACITY: usize = 1000;
const CURRENT_NAMESPACE: &str = "currw";
const PREVIOUS_NAMESPACE: &str = "prevw";

/// Length of a sliding window limiter's fixed windows
///
/// ```
/// use keylimiter::WindowUnit;
///
/// let unit: WindowUnit = "minute".parse().unwrap();
/// assert_eq!(unit, WindowUnit::Minute);
/// assert_eq!(unit.interval(), 60);
/// assert!("fortnight".parse::<WindowUnit>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowUnit {
    Second,
    Minute,
    Hour,
}

impl WindowUnit {
    /// Window length in seconds
    pub fn interval(&self) -> u64 {
        match self {
            WindowUnit::Second => 1,
            WindowUnit::Minute => 60,
            WindowUnit::Hour => 3600,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WindowUnit::Second => "second",
            WindowUnit::Minute => "minute",
            WindowUnit::Hour => "hour",
        }
    }
}

impl fmt::Display for WindowUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WindowUnit {
    type Err = LimiterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "second" => Ok(WindowUnit::Second),
            "minute" => Ok(WindowUnit::Minute),
            "hour" => Ok(WindowUnit::Hour),
            _ => Err(LimiterError::UnknownWindowUnit(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    count: u64,
    id: i64,
}

impl Window {
    fn empty(id: i64) -> Self {
        Window { count: 0, id }
    }
}

/// Per-key sliding window counter rate limiter
///
/// Admits at most `max_requests` calls per key in any window-sized span,
/// approximating the span by interpolating between two fixed windows.
///
/// # Example
///
/// ```
/// use keylimiter::{KeyLimiter, ManualClock, SlidingWindowLimiter, WindowUnit};
///
/// let clock = ManualClock::new();
/// let limiter = SlidingWindowLimiter::builder(5, WindowUnit::Minute)
///     .clock(clock.clone())
///     .build()?;
///
/// for _ in 0..5 {
///     assert!(limiter.allow("api_key_12345"));
/// }
/// assert!(!limiter.allow("api_key_12345"));
/// assert_eq!(limiter.retry_after("api_key_12345"), 60);
///
/// clock.advance(45.0);
/// assert_eq!(limiter.retry_after("api_key_12345"), 15);
/// # Ok::<(), keylimiter::LimiterError>(())
/// ```
pub struct SlidingWindowLimiter {
    max_requests: u64,
    unit: WindowUnit,
    interval: f64,
    clock: Arc<dyn Clock>,
    current: Namespace,
    previous: Namespace,
    store: Mutex<TtlStore<Window>>,
}

/// Builder for configuring a SlidingWindowLimiter
pub struct SlidingWindowBuilder {
    max_requests: u64,
    unit: WindowUnit,
    clock: Option<Arc<dyn Clock>>,
    capacity: usize,
}

impl SlidingWindowLimiter {
    /// Create a limiter driven by a [`MonotonicClock`]
    ///
    /// # Errors
    ///
    /// - [`LimiterError::InvalidMaxRequests`]: `max_requests` is zero
    pub fn new(max_requests: u64, unit: WindowUnit) -> Result<Self, LimiterError> {
        Self::builder(max_requests, unit).build()
    }

    /// Create a new builder for configuring a SlidingWindowLimiter
    pub fn builder(max_requests: u64, unit: WindowUnit) -> SlidingWindowBuilder {
        SlidingWindowBuilder {
            max_requests,
            unit,
            clock: None,
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// Maximum calls per key in a window
    pub fn max_requests(&self) -> u64 {
        self.max_requests
    }

    pub fn window_unit(&self) -> WindowUnit {
        self.unit
    }

    fn window_id(&self, now: f64) -> i64 {
        (now / self.interval).floor() as i64
    }

    /// Roll the key's windows forward to the one containing `now`
    fn tick(&self, store: &mut TtlStore<Window>, key: &str, now: f64) {
        let curr_id = self.window_id(now);
        let mut current = self.current.view(store);

        match current.get(key) {
            None => current.set(key, Window::empty(curr_id)),
            Some(window) if window.id >= curr_id => {}
            Some(window) if window.id == curr_id.saturating_sub(1) => {
                current.set(key, Window::empty(curr_id));
                self.previous.view(store).set(key, window);
            }
            // Untouched for more than a full window. The previous window is
            // left as is; it no longer matches `curr_id - 1` and counts as 0.
            Some(_) => current.set(key, Window::empty(curr_id)),
        }
    }

    fn rolling_count(&self, store: &mut TtlStore<Window>, key: &str, now: f64) -> u64 {
        let curr_id = self.window_id(now);

        let curr_count = self
            .current
            .view(store)
            .get(key)
            .filter(|window| window.id == curr_id)
            .map_or(0, |window| window.count);
        let prev_count = self
            .previous
            .view(store)
            .get(key)
            .filter(|window| window.id == curr_id.saturating_sub(1))
            .map_or(0, |window| window.count);

        if prev_count == 0 {
            return curr_count;
        }

        let elapsed = now.rem_euclid(self.interval);
        let prev_fraction = (self.interval - elapsed) / self.interval;

        (curr_count as f64 + prev_fraction * prev_count as f64).floor() as u64
    }

    fn remaining_after_tick(&self, store: &mut TtlStore<Window>, key: &str, now: f64) -> u64 {
        self.max_requests
            .saturating_sub(self.rolling_count(store, key, now))
    }

    fn admit(&self, store: &mut TtlStore<Window>, key: &str, now: f64) -> bool {
        self.tick(store, key, now);

        if self.rolling_count(store, key, now) >= self.max_requests {
            trace!(key, "sliding window full");
            return false;
        }

        // The call always lands in the current window, wherever the rolling
        // estimate put its weight
        let mut current = self.current.view(store);
        let window = current
            .get(key)
            .unwrap_or_else(|| Window::empty(self.window_id(now)));
        current.set(
            key,
            Window {
                count: window.count + 1,
                ..window
            },
        );
        true
    }

    // Time until the current fixed window rolls over, an upper bound on when
    // the rolling count can next drop
    fn retry_after_for(&self, remaining: u64, now: f64) -> u64 {
        if remaining > 0 {
            return 0;
        }
        (self.interval - now.rem_euclid(self.interval)).ceil() as u64
    }
}

impl KeyLimiter for SlidingWindowLimiter {
    fn allow(&self, key: &str) -> bool {
        let mut store = self.store.lock();
        let now = self.clock.now();
        self.admit(&mut store, key, now)
    }

    fn limit(&self, _key: &str) -> u64 {
        self.max_requests
    }

    fn remaining(&self, key: &str) -> u64 {
        let mut store = self.store.lock();
        let now = self.clock.now();
        self.tick(&mut store, key, now);
        self.remaining_after_tick(&mut store, key, now)
    }

    fn retry_after(&self, key: &str) -> u64 {
        let mut store = self.store.lock();
        let now = self.clock.now();
        self.tick(&mut store, key, now);
        let remaining = self.remaining_after_tick(&mut store, key, now);
        self.retry_after_for(remaining, now)
    }

    fn check(&self, key: &str) -> RateLimitResult {
        let mut store = self.store.lock();
        let now = self.clock.now();

        let allowed = self.admit(&mut store, key, now);
        let remaining = self.remaining_after_tick(&mut store, key, now);

        RateLimitResult {
            allowed,
            limit: self.max_requests,
            remaining,
            retry_after: self.retry_after_for(remaining, now),
        }
    }
}

impl SlidingWindowBuilder {
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
    pub fn build(self) -> Result<SlidingWindowLimiter, LimiterError> {
        if self.max_requests == 0 {
            return Err(LimiterError::InvalidMaxRequests);
        }

        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(MonotonicClock::new()),
        };
        let interval = self.unit.interval() as f64;
        // Both windows of a key must outlive one full previous window
        let ttl = 2.0 * interval;

        debug!(
            max_requests = self.max_requests,
            window_unit = %self.unit,
            ttl,
            "sliding window limiter created"
        );

        Ok(SlidingWindowLimiter {
            max_requests: self.max_requests,
            unit: self.unit,
            interval,
            store: Mutex::new(TtlStore::with_shared_clock(
                ttl,
                Arc::clone(&clock),
                self.capacity,
            )),
            clock,
            current: Namespace::new(CURRENT_NAMESPACE),
            previous: Namespace::new(PREVIOUS_NAMESPACE),
        })
    }
}
