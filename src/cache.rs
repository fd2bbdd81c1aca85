//! Explicit response/discovery caching.
//!
//! Vendor fetchers repeatedly hit small discovery endpoints (dataset
//! listings, attribute catalogs, configuration documents). Instead of hiding
//! that behind implicit memoization, the cache is an explicit struct owned by
//! the component that needs it.
//!
//! Entries live for the process lifetime unless a TTL is set; the cache is
//! unbounded. For long-running processes with high key cardinality, call
//! [`TtlCache::cleanup`] periodically or set a `max_age`.

use dashmap::DashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted: Instant,
}

/// A concurrent key-value cache with an optional time-to-live.
///
/// Expired entries are evicted lazily on lookup and eagerly via
/// [`cleanup`](Self::cleanup). With `max_age = None`, entries never expire.
#[derive(Debug)]
pub struct TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    entries: DashMap<K, CacheEntry<V>>,
    max_age: Option<Duration>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Create a cache; `max_age = None` disables expiry
    #[must_use]
    pub fn new(max_age: Option<Duration>) -> Self {
        Self {
            entries: DashMap::new(),
            max_age,
        }
    }

    /// Look up a key, evicting it first if it has expired
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        if let Some(entry) = self.entries.get(key) {
            if self.is_expired(&entry) {
                drop(entry);
                self.entries.remove(key);
                return None;
            }
            return Some(entry.value.clone());
        }
        None
    }

    /// Insert or overwrite a value
    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted: Instant::now(),
            },
        );
    }

    /// Remove all expired entries
    pub fn cleanup(&self) {
        self.entries.retain(|_, entry| {
            !self
                .max_age
                .is_some_and(|max_age| entry.inserted.elapsed() > max_age)
        });
    }

    /// Remove all entries
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of entries, including any not-yet-evicted expired ones
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, entry: &CacheEntry<V>) -> bool {
        self.max_age
            .is_some_and(|max_age| entry.inserted.elapsed() > max_age)
    }
}
