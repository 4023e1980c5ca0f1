use super::KeyValueStore;
use crate::core::clock::Clock;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::trace;

#[cfg(feature = "ahash")]
use ahash::AHashMap as HashMap;
#[cfg(not(feature = "ahash"))]
use std::collections::HashMap;

// Configuration constants
const DEFAULT_CAPACITY: usize = 1000;
const COMPACTION_SLACK: usize = 64;

struct Slot<V> {
    value: V,
    expires_at: f64,
    // Write sequence number, matched against the write log
    stamp: u64,
}

/// In-memory store whose entries expire `ttl` seconds after their last write
///
/// Keys are kept in last-write order. Every `get` and `set` first runs a
/// cleanup pass that walks from the oldest write towards the newest,
/// removing expired entries, and stops at the first entry still alive. With a
/// fixed TTL and a non-decreasing clock, write order is expiry order, so the
/// pass never misses an expired entry and never looks past a live one.
///
/// An entry is visible only while `now < expires_at`, whatever the cleanup
/// pass has or has not reached.
///
/// The store has no locking of its own; limiters own one each and only touch
/// it while holding their lock.
///
/// # Example
///
/// ```
/// use keylimiter::{KeyValueStore, ManualClock, TtlStore};
///
/// let clock = ManualClock::new();
/// let mut store = TtlStore::new(2.0, clock.clone());
///
/// store.set("session", "abc");
/// clock.advance(1.0);
/// assert_eq!(store.get("session"), Some("abc"));
///
/// clock.advance(1.0);
/// assert_eq!(store.get("session"), None);
/// assert!(store.is_empty());
/// ```
pub struct TtlStore<V> {
    data: HashMap<String, Slot<V>>,
    // Write log, oldest first. A record is stale once its key has been
    // written again or evicted.
    writes: VecDeque<(String, u64)>,
    ttl: f64,
    clock: Arc<dyn Clock>,
    next_stamp: u64,
}

impl<V> TtlStore<V> {
    /// Create a store whose entries live `ttl` seconds after each write
    ///
    /// `f64::INFINITY` makes entries live forever.
    pub fn new(ttl: f64, clock: impl Clock + 'static) -> Self {
        Self::with_capacity(ttl, clock, DEFAULT_CAPACITY)
    }

    /// Create a store preallocated for `capacity` keys
    pub fn with_capacity(ttl: f64, clock: impl Clock + 'static, capacity: usize) -> Self {
        Self::with_shared_clock(ttl, Arc::new(clock), capacity)
    }

    pub(crate) fn with_shared_clock(ttl: f64, clock: Arc<dyn Clock>, capacity: usize) -> Self {
        debug_assert!(ttl >= 0.0, "ttl must be non-negative");
        TtlStore {
            data: HashMap::with_capacity(capacity),
            writes: VecDeque::with_capacity(capacity),
            ttl,
            clock,
            next_stamp: 0,
        }
    }

    /// Time-to-live of every entry, in seconds
    pub fn ttl(&self) -> f64 {
        self.ttl
    }

    /// Number of entries held, including expired ones not yet cleaned up
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn write_log_len(&self) -> usize {
        self.writes.len()
    }

    fn clean_expired(&mut self, now: f64) {
        let mut evicted = 0usize;

        while let Some((key, stamp)) = self.writes.front() {
            // None when the record was superseded by a later write
            let expires_at = match self.data.get(key) {
                Some(slot) if slot.stamp == *stamp => Some(slot.expires_at),
                _ => None,
            };

            if let Some(expires_at) = expires_at {
                if expires_at > now {
                    break;
                }
                self.data.remove(key);
                evicted += 1;
            }
            self.writes.pop_front();
        }

        if evicted > 0 {
            trace!(evicted, live = self.data.len(), "evicted expired entries");
        }
    }

    // Drop stale write records once they outnumber the live entries, so the
    // log stays proportional to the key count even when nothing expires.
    fn maybe_compact(&mut self) {
        if self.writes.len() <= self.data.len() * 2 + COMPACTION_SLACK {
            return;
        }

        let data = &self.data;
        self.writes
            .retain(|(key, stamp)| data.get(key).is_some_and(|slot| slot.stamp == *stamp));
    }
}

impl<V: Clone> KeyValueStore<V> for TtlStore<V> {
    fn get(&mut self, key: &str) -> Option<V> {
        let now = self.clock.now();
        self.clean_expired(now);

        self.data
            .get(key)
            .filter(|slot| slot.expires_at > now)
            .map(|slot| slot.value.clone())
    }

    fn set(&mut self, key: &str, value: V) {
        let now = self.clock.now();
        self.clean_expired(now);

        let stamp = self.next_stamp;
        self.next_stamp += 1;

        self.data.insert(
            key.to_owned(),
            Slot {
                value,
                expires_at: now + self.ttl,
                stamp,
            },
        );
        self.writes.push_back((key.to_owned(), stamp));
        self.maybe_compact();
    }
}
