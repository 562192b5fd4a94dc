//! Keyed result store with a time-to-live
//!
//! Used to avoid refetching and re-evaluating the same station/parameter
//! series within a short period. Entries expire once their age reaches the
//! TTL; expired entries are dropped lazily on lookup or eagerly with
//! [`ResultCache::purge_expired`].

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// Thread-safe TTL cache; share it behind an `Arc`
#[derive(Debug)]
pub struct ResultCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> ResultCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<K, CacheEntry<V>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_expired(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        now.saturating_duration_since(entry.inserted_at) >= self.ttl
    }

    /// Fresh value for `key`, if any
    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Lookup as of `now`
    pub fn get_at(&self, key: &K, now: Instant) -> Option<V> {
        let mut entries = self.entries();
        match entries.get(key) {
            Some(entry) if !self.is_expired(entry, now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    /// Insert as of `now`
    pub fn insert_at(&self, key: K, value: V, now: Instant) {
        self.entries().insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
            },
        );
    }

    /// Drop `key`; returns whether an entry was present
    pub fn invalidate(&self, key: &K) -> bool {
        self.entries().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Drop every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| now.saturating_duration_since(entry.inserted_at) < self.ttl);
        let removed = before - entries.len();
        if removed > 0 {
            debug!("Purged {} expired cache entries", removed);
        }
        removed
    }

    /// Number of stored entries, expired or not
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn create_test_cache() -> ResultCache<(u32, u32), f64> {
        ResultCache::new(Duration::from_secs(300))
    }

    #[test]
    fn test_fresh_entry_is_returned() {
        let cache = create_test_cache();
        let now = Instant::now();
        cache.insert_at((98210, 1), 92.5, now);

        assert_eq!(cache.get_at(&(98210, 1), now + Duration::from_secs(299)), Some(92.5));
        assert_eq!(cache.get_at(&(98210, 4), now), None);
    }

    #[test]
    fn test_entry_expires_at_ttl() {
        let cache = create_test_cache();
        let now = Instant::now();
        cache.insert_at((98210, 1), 92.5, now);

        assert_eq!(cache.get_at(&(98210, 1), now + Duration::from_secs(300)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_reinsert_refreshes_entry() {
        let cache = create_test_cache();
        let now = Instant::now();
        cache.insert_at((1, 1), 50.0, now);
        cache.insert_at((1, 1), 75.0, now + Duration::from_secs(200));

        assert_eq!(cache.get_at(&(1, 1), now + Duration::from_secs(400)), Some(75.0));
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = create_test_cache();
        cache.insert((1, 1), 1.0);
        cache.insert((2, 1), 2.0);

        assert!(cache.invalidate(&(1, 1)));
        assert!(!cache.invalidate(&(1, 1)));
        assert_eq!(cache.get(&(2, 1)), Some(2.0));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_expired_keeps_fresh_entries() {
        let cache = create_test_cache();
        let now = Instant::now();
        cache.insert_at((1, 1), 1.0, now);
        cache.insert_at((2, 1), 2.0, now + Duration::from_secs(250));

        let removed = cache.purge_expired_at(now + Duration::from_secs(320));

        assert_eq!(removed, 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_at(&(2, 1), now + Duration::from_secs(320)), Some(2.0));
    }

    #[test]
    fn test_shared_across_threads() {
        let cache = Arc::new(create_test_cache());
        let handles: Vec<_> = (0..4u32)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.insert((i, 1), i as f64))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 4);
        assert_eq!(cache.get(&(3, 1)), Some(3.0));
    }
}
