//! Shared collection abstractions used throughout fp-core.
//!
//! The default build uses `dashmap::DashMap` for concurrency.

use dashmap::DashMap;
use std::hash::Hash;

pub struct ConcurrentMap<K, V> {
    inner: DashMap<K, V>,
}

impl<K, V> Default for ConcurrentMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ConcurrentMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            inner: dashmap::DashMap::new(),
        }
    }

    pub fn get_cloned(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.inner.get(key).map(|entry| entry.value().clone())
    }

    /// Returns the value stored under `key`, creating it with `init` first if
    /// the key is absent. Creation happens under the shard lock, so concurrent
    /// callers racing on the same key all observe the same value.
    pub fn get_or_insert_with<F>(&self, key: K, init: F) -> V
    where
        V: Clone,
        F: FnOnce() -> V,
    {
        self.inner.entry(key).or_insert_with(init).value().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
