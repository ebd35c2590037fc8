
use std::collections::{HashMap, VecDeque};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::CacheConfig;

/// Bounded in-process cache from text content to a previously computed
/// embedding vector.
///
/// Eviction is strict insertion order: when the cache is full, the single
/// oldest-inserted entry is dropped. A `get` never refreshes recency. Entries
/// older than the TTL are reported absent. When disabled, `get` always
/// misses and `put` is a no-op.
pub struct EmbeddingCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
    ttl: Duration,
    enabled: bool,
}

struct CacheInner {
    entries: HashMap<u64, CacheEntry>,
    insertion_order: VecDeque<u64>,
}

struct CacheEntry {
    vector: Vec<f32>,
    inserted_at: Instant,
}

impl EmbeddingCache {
    #[inline]
    pub fn new(enabled: bool, capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                insertion_order: VecDeque::new(),
            }),
            capacity,
            ttl,
            enabled,
        }
    }

    #[inline]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            config.enabled,
            config.max_entries,
            Duration::from_secs(config.ttl_seconds),
        )
    }

    #[inline]
    pub fn get(&self, text: &str) -> Option<Vec<f32>> {
        if !self.enabled {
            return None;
        }

        let key = content_key(text);
        let mut inner = self.inner.lock().expect("cache lock poisoned");

        let expired = inner
            .entries
            .get(&key)
            .is_some_and(|entry| entry.inserted_at.elapsed() > self.ttl);
        if expired {
            inner.entries.remove(&key);
            return None;
        }

        inner.entries.get(&key).map(|entry| entry.vector.clone())
    }

    #[inline]
    pub fn put(&self, text: &str, vector: Vec<f32>) {
        if !self.enabled || self.capacity == 0 {
            return;
        }

        let key = content_key(text);
        let mut inner = self.inner.lock().expect("cache lock poisoned");

        if let Some(entry) = inner.entries.get_mut(&key) {
            // Same content re-embedded: refresh in place, keep its slot in
            // the insertion order.
            entry.vector = vector;
            entry.inserted_at = Instant::now();
            return;
        }

        // Keys evicted lazily (expired entries removed by `get`) may linger
        // in the order queue; popping them is a no-op on the map.
        while inner.entries.len() >= self.capacity {
            match inner.insertion_order.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                }
                None => break,
            }
        }

        inner.entries.insert(
            key,
            CacheEntry {
                vector,
                inserted_at: Instant::now(),
            },
        );
        inner.insertion_order.push_back(key);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache lock poisoned").entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

fn content_key(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}
