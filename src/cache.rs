use dashmap::DashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Concurrent string-keyed memo. Once full, new keys are dropped rather than
/// evicting existing ones.
#[derive(Clone)]
pub struct Cache<V: Clone> {
    cache: Arc<DashMap<String, V>>,
    capacity: usize,
}

impl<V: Clone> Cache<V> {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).map_or(100, NonZeroUsize::get);
        Self {
            cache: Arc::new(DashMap::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.cache.get(key).map(|entry| entry.clone())
    }

    pub fn set(&self, key: String, value: V) {
        if self.cache.len() >= self.capacity && !self.cache.contains_key(&key) {
            return;
        }
        self.cache.insert(key, value);
    }

    pub fn remove(&self, key: &str) -> Option<V> {
        self.cache.remove(key).map(|(_, v)| v)
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
