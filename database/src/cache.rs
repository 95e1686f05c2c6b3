use granary_utils::mem_size::{MemMode, MemSizeEstimator};
use lru::LruCache;
use parking_lot::RwLock;
use std::{
    collections::hash_map::RandomState,
    hash::BuildHasher,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CachePolicy {
    /// Caching is disabled
    Empty,
    /// Holds at most this many entries
    Count(usize),
    /// Holds entries up to `max_size` as measured by `mem_mode`, but never fewer than `min_items`
    /// (a single oversized entry does not empty the cache)
    Tracked { max_size: usize, min_items: usize, mem_mode: MemMode },
}

impl CachePolicy {
    fn is_empty(&self) -> bool {
        matches!(self, CachePolicy::Empty | CachePolicy::Count(0))
            || matches!(self, CachePolicy::Tracked { max_size: 0, min_items: 0, .. })
    }
}

/// Observability counters of a single cache instance
#[derive(Default, Debug)]
pub struct CacheCounters {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub inserts: AtomicU64,
    pub evictions: AtomicU64,
}

impl CacheCounters {
    pub fn snapshot(&self) -> CacheCountersSnapshot {
        CacheCountersSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct CacheCountersSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
}

impl CacheCountersSnapshot {
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 { 0f64 } else { self.hits as f64 / lookups as f64 }
    }
}

impl core::ops::Sub for &CacheCountersSnapshot {
    type Output = CacheCountersSnapshot;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::Output {
            hits: self.hits.saturating_sub(rhs.hits),
            misses: self.misses.saturating_sub(rhs.misses),
            inserts: self.inserts.saturating_sub(rhs.inserts),
            evictions: self.evictions.saturating_sub(rhs.evictions),
        }
    }
}

struct Inner<TKey, TData, S = RandomState>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync + MemSizeEstimator,
{
    // Bounds are enforced by us according to the policy, so the LRU itself is unbounded
    map: LruCache<TKey, TData, S>,
    tracked_size: usize,
}

/// A bounded, recency-evicting, thread-safe cache. Lookups never fail: a miss is just `None`.
#[derive(Clone)]
pub struct Cache<TKey, TData, S = RandomState>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync + MemSizeEstimator,
{
    inner: Arc<RwLock<Inner<TKey, TData, S>>>,
    policy: CachePolicy,
    counters: Arc<CacheCounters>,
}

impl<TKey, TData, S> Cache<TKey, TData, S>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync + MemSizeEstimator,
    S: BuildHasher + Default,
{
    pub fn new(policy: CachePolicy) -> Self {
        let inner = Inner { map: LruCache::unbounded_with_hasher(S::default()), tracked_size: 0 };
        Self { inner: Arc::new(RwLock::new(inner)), policy, counters: Default::default() }
    }

    pub fn counters(&self) -> Arc<CacheCounters> {
        self.counters.clone()
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.inner.read().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the cached value and marks it as most recently used
    pub fn get(&self, key: &TKey) -> Option<TData> {
        if self.policy.is_empty() {
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        // Promotion mutates recency order, hence the write lock
        let found = self.inner.write().map.get(key).cloned();
        match found {
            Some(_) => self.counters.hits.fetch_add(1, Ordering::Relaxed),
            None => self.counters.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// Checks membership without touching recency or counters
    pub fn contains_key(&self, key: &TKey) -> bool {
        self.inner.read().map.contains(key)
    }

    fn size_of(&self, data: &TData) -> usize {
        match self.policy {
            CachePolicy::Tracked { mem_mode, .. } => data.estimate_size(mem_mode),
            _ => 1,
        }
    }

    fn insert_impl(&self, inner: &mut Inner<TKey, TData, S>, key: TKey, data: TData) {
        inner.tracked_size += self.size_of(&data);
        if let Some((_, replaced)) = inner.map.push(key, data) {
            inner.tracked_size = inner.tracked_size.saturating_sub(self.size_of(&replaced));
        }
        self.counters.inserts.fetch_add(1, Ordering::Relaxed);

        let mut evicted = 0u64;
        match self.policy {
            CachePolicy::Empty => {}
            CachePolicy::Count(max) => {
                while inner.map.len() > max {
                    if inner.map.pop_lru().is_none() {
                        break;
                    }
                    evicted += 1;
                }
                inner.tracked_size = inner.map.len();
            }
            CachePolicy::Tracked { max_size, min_items, .. } => {
                while inner.tracked_size > max_size && inner.map.len() > min_items {
                    match inner.map.pop_lru() {
                        Some((_, v)) => {
                            inner.tracked_size = inner.tracked_size.saturating_sub(self.size_of(&v));
                            evicted += 1;
                        }
                        None => break,
                    }
                }
            }
        }
        if evicted > 0 {
            self.counters.evictions.fetch_add(evicted, Ordering::Relaxed);
        }
    }

    pub fn insert(&self, key: TKey, data: TData) {
        if self.policy.is_empty() {
            return;
        }
        let mut write_guard = self.inner.write();
        self.insert_impl(&mut write_guard, key, data);
    }

    pub fn insert_many(&self, iter: &mut impl Iterator<Item = (TKey, TData)>) {
        if self.policy.is_empty() {
            return;
        }
        let mut write_guard = self.inner.write();
        for (key, data) in iter {
            self.insert_impl(&mut write_guard, key, data);
        }
    }

    fn remove_impl(&self, inner: &mut Inner<TKey, TData, S>, key: &TKey) -> Option<TData> {
        let removed = inner.map.pop(key)?;
        inner.tracked_size = inner.tracked_size.saturating_sub(self.size_of(&removed));
        Some(removed)
    }

    pub fn remove(&self, key: &TKey) -> Option<TData> {
        if self.policy.is_empty() {
            return None;
        }
        let mut write_guard = self.inner.write();
        self.remove_impl(&mut write_guard, key)
    }

    pub fn remove_many(&self, key_iter: &mut impl Iterator<Item = TKey>) {
        if self.policy.is_empty() {
            return;
        }
        let mut write_guard = self.inner.write();
        for key in key_iter {
            self.remove_impl(&mut write_guard, &key);
        }
    }

    pub fn remove_all(&self) {
        let mut write_guard = self.inner.write();
        write_guard.map.clear();
        write_guard.tracked_size = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Blob(usize);

    impl MemSizeEstimator for Blob {
        fn estimate_mem_bytes(&self) -> usize {
            self.0
        }
    }

    #[test]
    fn test_count_policy_evicts_least_recent() {
        let cache = Cache::<u64, u64>::new(CachePolicy::Count(2));
        cache.insert(1, 10);
        cache.insert(2, 20);
        // Touch 1 so that 2 becomes the eviction candidate
        assert_eq!(cache.get(&1), Some(10));
        cache.insert(3, 30);
        assert_eq!(cache.len(), 2);
        assert!(cache.contains_key(&1));
        assert!(!cache.contains_key(&2));
        assert!(cache.contains_key(&3));

        let snapshot = cache.counters().snapshot();
        assert_eq!(snapshot, CacheCountersSnapshot { hits: 1, misses: 0, inserts: 3, evictions: 1 });
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.counters().snapshot().misses, 1);
        assert_eq!(cache.counters().snapshot().hit_ratio(), 0.5);
    }

    #[test]
    fn test_tracked_policy_respects_byte_budget() {
        let policy = CachePolicy::Tracked { max_size: 100, min_items: 1, mem_mode: MemMode::Bytes };
        let cache = Cache::<u64, Blob>::new(policy);
        cache.insert(1, Blob(40));
        cache.insert(2, Blob(40));
        cache.insert(3, Blob(40));
        assert!(!cache.contains_key(&1));
        assert_eq!(cache.len(), 2);
        // An entry larger than the whole budget is still kept due to `min_items`
        cache.insert(4, Blob(500));
        assert_eq!(cache.len(), 1);
        assert!(cache.contains_key(&4));
        cache.remove(&4);
        assert!(cache.is_empty());
        assert_eq!(cache.counters().snapshot().evictions, 3);
    }

    #[test]
    fn test_replacing_keeps_size_consistent() {
        let policy = CachePolicy::Tracked { max_size: 100, min_items: 0, mem_mode: MemMode::Bytes };
        let cache = Cache::<u64, Blob>::new(policy);
        for _ in 0..10 {
            cache.insert(1, Blob(60));
        }
        cache.insert(2, Blob(40));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.counters().snapshot().evictions, 0);
    }

    #[test]
    fn test_empty_policy() {
        let cache = Cache::<u64, u64>::new(CachePolicy::Empty);
        cache.insert(1, 1);
        assert_eq!(cache.get(&1), None);
        assert!(cache.is_empty());
        assert_eq!(cache.counters().snapshot().inserts, 0);
    }
}
