//! # Cache Category
//!
//! One bounded LRU plus its changing-set, guarded by a single mutex so the
//! pair is always observed atomically.

use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::hash::Hash;
use std::num::NonZeroUsize;

struct Inner<K: Hash + Eq, V> {
    lru: LruCache<K, V>,
    changing: HashSet<K>,
}

/// A read-through LRU with a write barrier.
pub struct CacheCategory<K: Hash + Eq, V> {
    inner: Mutex<Inner<K, V>>,
}

impl<K: Hash + Eq + Clone, V: Clone> CacheCategory<K, V> {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                lru: LruCache::new(capacity),
                changing: HashSet::new(),
            }),
        }
    }

    /// Read through the cache. A key in the changing-set always loads from
    /// the authoritative store and is never cached; otherwise a miss loads
    /// and populates the LRU.
    pub fn get_through<E>(
        &self,
        key: &K,
        load: impl FnOnce() -> Result<Option<V>, E>,
    ) -> Result<Option<V>, E> {
        {
            let mut inner = self.inner.lock();
            if !inner.changing.contains(key) {
                if let Some(value) = inner.lru.get(key) {
                    return Ok(Some(value.clone()));
                }
            } else {
                drop(inner);
                return load();
            }
        }
        let loaded = load()?;
        if let Some(value) = &loaded {
            let mut inner = self.inner.lock();
            // the key may have started changing while we were loading
            if !inner.changing.contains(key) {
                inner.lru.put(key.clone(), value.clone());
            }
        }
        Ok(loaded)
    }

    /// Insert a decoded value; rejected while the key is changing.
    pub fn put(&self, key: K, value: V) {
        let mut inner = self.inner.lock();
        if inner.changing.contains(&key) {
            return;
        }
        inner.lru.put(key, value);
    }

    /// Drop the given keys from the LRU.
    pub fn evict<'a>(&self, keys: impl Iterator<Item = &'a K>)
    where
        K: 'a,
    {
        let mut inner = self.inner.lock();
        for key in keys {
            inner.lru.pop(key);
        }
    }

    /// Enter the write barrier for the given keys.
    pub fn mark_changing(&self, keys: impl Iterator<Item = K>) {
        let mut inner = self.inner.lock();
        inner.changing.extend(keys);
    }

    /// Leave the write barrier entirely.
    pub fn clear_changing(&self) {
        self.inner.lock().changing.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_then_hit() {
        let cache: CacheCategory<u32, String> = CacheCategory::new(4);
        let value = cache
            .get_through(&1, || Ok::<_, ()>(Some("a".to_string())))
            .unwrap();
        assert_eq!(value.as_deref(), Some("a"));
        // loader no longer consulted
        let value = cache.get_through(&1, || Ok::<_, ()>(None)).unwrap();
        assert_eq!(value.as_deref(), Some("a"));
    }

    #[test]
    fn test_changing_key_is_not_cached() {
        let cache: CacheCategory<u32, String> = CacheCategory::new(4);
        cache.mark_changing([1u32].into_iter());
        let value = cache
            .get_through(&1, || Ok::<_, ()>(Some("fresh".to_string())))
            .unwrap();
        assert_eq!(value.as_deref(), Some("fresh"));
        cache.clear_changing();
        // nothing was cached during the barrier
        let value = cache.get_through(&1, || Ok::<_, ()>(None)).unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_put_rejected_while_changing() {
        let cache: CacheCategory<u32, String> = CacheCategory::new(4);
        cache.mark_changing([7u32].into_iter());
        cache.put(7, "stale".to_string());
        cache.clear_changing();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_lru_bound_holds() {
        let cache: CacheCategory<u32, u32> = CacheCategory::new(2);
        cache.put(1, 1);
        cache.put(2, 2);
        cache.put(3, 3);
        assert_eq!(cache.len(), 2);
    }
}
