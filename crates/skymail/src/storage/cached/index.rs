//! Mutex-guarded LRU index.

use std::borrow::Borrow;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use lru::LruCache;

/// One cache index: an LRU map behind its own lock.
///
/// Every method takes and releases the lock internally, so a guard never
/// outlives the call and cannot be held across an `.await`.
pub(super) struct Index<K: Hash + Eq + Clone, V: Clone> {
    entries: Mutex<LruCache<K, V>>,
}

impl<K: Hash + Eq + Clone, V: Clone> Index<K, V> {
    pub(super) fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Locks the index. A poisoned lock is recovered: the index only holds
    /// copies of stored rows and is safe to keep using.
    pub(super) fn lock(&self) -> MutexGuard<'_, LruCache<K, V>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lock().get(key).cloned()
    }

    pub(super) fn put(&self, key: K, value: V) {
        self.lock().put(key, value);
    }

    pub(super) fn pop<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lock().pop(key)
    }

    /// Removes every entry whose value matches `predicate`.
    pub(super) fn pop_where(&self, predicate: impl Fn(&V) -> bool) -> usize {
        let mut entries = self.lock();
        let doomed: Vec<K> = entries
            .iter()
            .filter(|(_, v)| predicate(v))
            .map(|(k, _)| k)
            .cloned()
            .collect();
        for key in &doomed {
            entries.pop(key);
        }
        doomed.len()
    }

    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        self.lock().len()
    }
}
