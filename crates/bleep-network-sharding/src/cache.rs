// Bounded key/value caches shared by the sharding components.
//
// Every role gets its own strongly typed cache instance.

use crate::error::CacheError;
use lru::LruCache;
use parking_lot::Mutex;
use std::hash::Hash;
use std::num::NonZeroUsize;

/// Thread-safe bounded cache contract.
///
/// `size_hint` is the caller's estimate of the entry weight in bytes. Capacity
/// accounting is per entry; the hint is tracked for reporting only.
pub trait Cacher<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Option<V>;

    /// Inserts or overwrites. Returns the entry of another key evicted to make room.
    fn put(&self, key: K, value: V, size_hint: usize) -> Option<(K, V)>;

    fn remove(&self, key: &K);

    /// Inserts only when the key is absent. Returns true if the key was already present.
    fn has_or_add(&self, key: K, value: V, size_hint: usize) -> bool;

    fn contains(&self, key: &K) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn max_size(&self) -> usize;
}

struct LruInner<K: Hash + Eq, V> {
    entries: LruCache<K, (V, usize)>,
    weight: usize,
}

/// LRU implementation of [`Cacher`] guarded by a mutex.
pub struct LruCacher<K: Hash + Eq, V> {
    inner: Mutex<LruInner<K, V>>,
    capacity: NonZeroUsize,
}

impl<K: Hash + Eq, V> LruCacher<K, V> {
    pub fn new(name: &'static str, capacity: usize) -> Result<Self, CacheError> {
        let capacity = NonZeroUsize::new(capacity).ok_or(CacheError::ZeroCapacity { name })?;
        Ok(Self {
            inner: Mutex::new(LruInner {
                entries: LruCache::new(capacity),
                weight: 0,
            }),
            capacity,
        })
    }

    /// Sum of the size hints of the entries currently held.
    pub fn weight(&self) -> usize {
        self.inner.lock().weight
    }
}

impl<K: Hash + Eq, V> LruInner<K, V> {
    /// Returns whatever `push` displaced: the old value of the same key or the LRU entry.
    fn insert(&mut self, key: K, value: V, size_hint: usize) -> Option<(K, V)> {
        let displaced = self.entries.push(key, (value, size_hint));
        let released = displaced.as_ref().map(|(_, (_, weight))| *weight).unwrap_or(0);
        self.weight = self.weight.saturating_sub(released) + size_hint;
        displaced.map(|(key, (value, _))| (key, value))
    }
}

impl<K, V> Cacher<K, V> for LruCacher<K, V>
where
    K: Hash + Eq + Clone + Send,
    V: Clone + Send,
{
    fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().entries.get(key).map(|(value, _)| value.clone())
    }

    fn put(&self, key: K, value: V, size_hint: usize) -> Option<(K, V)> {
        let mut inner = self.inner.lock();
        let replacing = inner.entries.contains(&key);
        let displaced = inner.insert(key, value, size_hint);
        if replacing {
            return None;
        }
        displaced
    }

    fn remove(&self, key: &K) {
        let mut inner = self.inner.lock();
        if let Some((_, weight)) = inner.entries.pop(key) {
            inner.weight = inner.weight.saturating_sub(weight);
        }
    }

    fn has_or_add(&self, key: K, value: V, size_hint: usize) -> bool {
        let mut inner = self.inner.lock();
        if inner.entries.contains(&key) {
            return true;
        }
        inner.insert(key, value, size_hint);
        false
    }

    fn contains(&self, key: &K) -> bool {
        self.inner.lock().entries.contains(key)
    }

    fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    fn max_size(&self) -> usize {
        self.capacity.get()
    }
}
