//! A thread-safe TTL cache backed by `DashMap`.
//!
//! The DAG router uses one of these, keyed by `(dag node, entity type)`, to
//! memoize the resolved transformer chain instead of re-walking the graph
//! for every entity.

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone)]
pub struct TtlCache<K, V> {
    inner: Arc<DashMap<K, (V, Instant)>>,
    ttl: Duration,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self { inner: Arc::new(DashMap::new()), ttl }
    }

    /// A cache with no expiry — entries live until evicted or removed.
    /// The DAG router uses this: a resolved transformer chain for a given
    /// node/entity-type pair never goes stale within one process lifetime.
    pub fn unbounded_ttl() -> Self {
        Self::new(Duration::from_secs(u64::MAX / 2))
    }

    pub fn get(&self, key: &K) -> Option<V> {
        if let Some(entry) = self.inner.get(key) {
            let (val, inserted) = entry.value();
            if inserted.elapsed() < self.ttl {
                return Some(val.clone());
            }
            drop(entry);
            self.inner.remove(key);
        }
        None
    }

    pub fn insert(&self, key: K, value: V) {
        self.inner.insert(key, (value, Instant::now()));
    }

    pub fn remove(&self, key: &K) {
        self.inner.remove(key);
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    pub fn evict_expired(&self) {
        self.inner.retain(|_, (_, inserted)| inserted.elapsed() < self.ttl);
    }
}
