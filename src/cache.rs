//! Time-bounded cache of last-known values
//!
//! Entries are checked lazily: an entry past its TTL is evicted by the read
//! that notices it. There is no background sweeper.
//!
//! ```rust
//! use darwin_telemetry::cache::ValueCache;
//! use std::time::{Duration, Instant};
//!
//! let cache = ValueCache::new(Duration::from_secs(5));
//! let now = Instant::now();
//! cache.set("TC0P", 48.5, now);
//!
//! assert_eq!(cache.get(&"TC0P", now + Duration::from_secs(5)), Some(48.5));
//! assert_eq!(cache.get(&"TC0P", now + Duration::from_secs(6)), None);
//! ```

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// A cached value and the moment it was written
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    written_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.written_at) > ttl
    }
}

/// Thread-safe map whose entries expire `ttl` after they were written
#[derive(Debug)]
pub struct ValueCache<K, V> {
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
    ttl: Duration,
}

impl<K, V> ValueCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self { entries: Mutex::new(HashMap::new()), ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Value for `key` if it was written no more than `ttl` before `now`.
    ///
    /// An expired entry is removed as a side effect.
    pub fn get(&self, key: &K, now: Instant) -> Option<V> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if !entry.is_expired(now, self.ttl) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            },
            None => None,
        }
    }

    pub fn set(&self, key: K, value: V, now: Instant) {
        self.entries.lock().insert(key, CacheEntry { value, written_at: now });
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
