//! Storage for per-key limiter state
//!
//! - [`KeyValueStore`]: the minimal `get`/`set` contract the limiters need
//! - [`TtlStore`]: in-memory store whose entries expire a fixed time after
//!   their last write
//! - [`Namespace`]: key prefixing so several logical tables share one store

mod ttl;

pub use ttl::TtlStore;


/// Key/value store trait for limiter state
///
/// Reads take `&mut self` because implementations are free to evict
/// expired entries while looking a key up.
pub trait KeyValueStore<V> {
    /// Get the value for `key`, or `None` if absent or expired
    fn get(&mut self, key: &str) -> Option<V>;

    /// Set the value for `key`
    fn set(&mut self, key: &str, value: V);
}

const SEPARATOR: &str = "::";

/// A key prefix identifying one logical table inside a shared store
///
/// A namespace holds no data. [`Namespace::view`] borrows a store and
/// returns a [`Namespaced`] facade that rewrites every key to
/// `"<namespace>::<key>"`.
///
/// ```
/// use keylimiter::{KeyValueStore, ManualClock, Namespace, TtlStore};
///
/// let mut store: TtlStore<u32> = TtlStore::new(60.0, ManualClock::new());
/// let current = Namespace::new("currw");
/// let previous = Namespace::new("prevw");
///
/// current.view(&mut store).set("10.0.0.1", 3);
/// previous.view(&mut store).set("10.0.0.1", 7);
///
/// assert_eq!(current.view(&mut store).get("10.0.0.1"), Some(3));
/// assert_eq!(previous.view(&mut store).get("10.0.0.1"), Some(7));
/// assert_eq!(store.get("currw::10.0.0.1"), Some(3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    prefix: String,
}

impl Namespace {
    pub fn new(name: &str) -> Self {
        Namespace {
            prefix: format!("{name}{SEPARATOR}"),
        }
    }

    /// The namespace name, without the separator
    pub fn name(&self) -> &str {
        &self.prefix[..self.prefix.len() - SEPARATOR.len()]
    }

    /// The fully qualified key for `key` in this namespace
    pub fn qualify(&self, key: &str) -> String {
        let mut qualified = String::with_capacity(self.prefix.len() + key.len());
        qualified.push_str(&self.prefix);
        qualified.push_str(key);
        qualified
    }

    /// Borrow `store` through this namespace
    pub fn view<'a, S: ?Sized>(&'a self, store: &'a mut S) -> Namespaced<'a, S> {
        Namespaced {
            namespace: self,
            store,
        }
    }
}

/// A [`Namespace`] applied to a borrowed store
pub struct Namespaced<'a, S: ?Sized> {
    namespace: &'a Namespace,
    store: &'a mut S,
}

impl<V, S> KeyValueStore<V> for Namespaced<'_, S>
where
    S: KeyValueStore<V> + ?Sized,
{
    fn get(&mut self, key: &str) -> Option<V> {
        self.store.get(&self.namespace.qualify(key))
    }

    fn set(&mut self, key: &str, value: V) {
        self.store.set(&self.namespace.qualify(key), value)
    }
}
