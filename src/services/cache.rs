//! Embedding cache with LRU eviction.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use lru::LruCache;
use sha2::{Digest, Sha256};

/// A thread-safe LRU embedding cache.
#[derive(Clone)]
pub struct EmbeddingCache {
    inner: Arc<Mutex<LruCache<String, Vec<f32>>>>,
    max_size: usize,
}

impl EmbeddingCache {
    /// Create a new cache, or `None` when `max_size` is zero.
    pub fn new(max_size: usize) -> Option<Self> {
        let capacity = NonZeroUsize::new(max_size)?;
        Some(Self {
            inner: Arc::new(Mutex::new(LruCache::new(capacity))),
            max_size,
        })
    }

    /// Generate a cache key from text, model and output dimension.
    pub fn generate_key(text: &str, model: &str, dimension: usize) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{}:{}:{}", model, dimension, text));
        format!("{:x}", hasher.finalize())
    }

    // A panic while holding the lock cannot leave a half-written entry behind.
    fn lock(&self) -> MutexGuard<'_, LruCache<String, Vec<f32>>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get an embedding from the cache, marking it as recently used.
    pub fn get(&self, key: &str) -> Option<Vec<f32>> {
        self.lock().get(key).cloned()
    }

    /// Insert an embedding, evicting the least recently used entry when full.
    pub fn insert(&self, key: String, value: Vec<f32>) {
        self.lock().put(key, value);
    }

    /// Get cache statistics as `(entries, capacity)`.
    pub fn stats(&self) -> (usize, usize) {
        (self.lock().len(), self.max_size)
    }

    /// Clear the cache.
    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_size_disables_cache() {
        assert!(EmbeddingCache::new(0).is_none());
    }

    #[test]
    fn test_cache_basic_operations() {
        let cache = EmbeddingCache::new(2).unwrap();

        let key1 = EmbeddingCache::generate_key("hello", "model1", 32);
        let key2 = EmbeddingCache::generate_key("world", "model1", 32);

        cache.insert(key1.clone(), vec![1.0, 2.0, 3.0]);
        cache.insert(key2.clone(), vec![4.0, 5.0, 6.0]);

        assert_eq!(cache.get(&key1), Some(vec![1.0, 2.0, 3.0]));
        assert!(cache.get(&key2).is_some());

        let (size, max) = cache.stats();
        assert_eq!(size, 2);
        assert_eq!(max, 2);

        cache.clear();
        assert_eq!(cache.stats().0, 0);
    }

    #[test]
    fn test_key_depends_on_dimension() {
        assert_ne!(
            EmbeddingCache::generate_key("hello", "model", 32),
            EmbeddingCache::generate_key("hello", "model", 64)
        );
    }

    #[test]
    fn test_cache_eviction() {
        let cache = EmbeddingCache::new(2).unwrap();

        let key1 = EmbeddingCache::generate_key("a", "model", 32);
        let key2 = EmbeddingCache::generate_key("b", "model", 32);
        let key3 = EmbeddingCache::generate_key("c", "model", 32);

        cache.insert(key1.clone(), vec![1.0]);
        cache.insert(key2.clone(), vec![2.0]);

        // Touch key1 so key2 becomes least recently used
        cache.get(&key1);

        cache.insert(key3.clone(), vec![3.0]);

        assert!(cache.get(&key1).is_some());
        assert!(cache.get(&key3).is_some());
        assert!(cache.get(&key2).is_none());
    }
}
