use std::collections::HashMap;

use tracing::debug;

use crate::error::AssetLoadError;
use crate::request::CacheKey;
use crate::residency::AssetState;

/// Share of the capacity dropped by one eviction pass.
pub const DEFAULT_EVICTION_FRACTION: f64 = 0.2;

#[derive(Debug, Clone)]
struct CacheEntry<A> {
    state: AssetState<A>,
    last_use: u64,
}

/// Bounded store of per-asset fetch state.
///
/// Every access stamps the entry with the next value of a monotonic use
/// counter. When an insertion pushes the entry count above `capacity`, one
/// pass evicts the `ceil(fraction * capacity)` entries with the smallest
/// stamps. The pass is a full scan and sort, fine for hundreds of entries;
/// an intrusive recency list would make it O(1) without changing behavior.
///
/// The entry being inserted is never chosen by the pass that its own
/// insertion triggers.
#[derive(Debug)]
pub struct TileCache<A> {
    capacity: usize,
    eviction_batch: usize,
    use_counter: u64,
    evicted_total: u64,
    entries: HashMap<CacheKey, CacheEntry<A>>,
}

impl<A> TileCache<A> {
    /// `capacity` is raised to at least 1.
    pub fn new(capacity: usize, eviction_fraction: f64) -> Self {
        let capacity = capacity.max(1);
        let eviction_batch = ((capacity as f64 * eviction_fraction).ceil() as usize).max(1);
        Self {
            capacity,
            eviction_batch,
            use_counter: 0,
            evicted_total: 0,
            entries: HashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(capacity, DEFAULT_EVICTION_FRACTION)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn eviction_batch(&self) -> usize {
        self.eviction_batch
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Total entries removed by eviction since creation.
    pub fn evicted_total(&self) -> u64 {
        self.evicted_total
    }

    /// Reads an entry without touching it.
    pub fn peek(&self, key: &CacheKey) -> Option<&AssetState<A>> {
        self.entries.get(key).map(|e| &e.state)
    }

    /// Last-use stamp of an entry, without touching it.
    pub fn last_use(&self, key: &CacheKey) -> Option<u64> {
        self.entries.get(key).map(|e| e.last_use)
    }

    /// Returns the entry for `key`, creating an `Unrequested` one on first
    /// access. Always touches the entry.
    pub fn get(&mut self, key: &CacheKey) -> &AssetState<A> {
        let stamp = self.next_stamp();
        if !self.entries.contains_key(key) {
            self.insert_new(key.clone(), AssetState::Unrequested, stamp);
        }
        let entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry {
                state: AssetState::Unrequested,
                last_use: stamp,
            });
        entry.last_use = stamp;
        &entry.state
    }

    /// Marks an entry as in flight. Returns `false` if it does not exist.
    pub fn mark_pending(&mut self, key: &CacheKey) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.state = AssetState::Pending;
                true
            }
            None => false,
        }
    }

    /// Stores a fetch outcome.
    ///
    /// Existing entries keep their last-use stamp; a missing entry (evicted
    /// while its fetch was in flight) is recreated as a fresh insertion.
    pub fn put(&mut self, key: &CacheKey, result: Result<A, AssetLoadError>) {
        let state = AssetState::from(result);
        match self.entries.get_mut(key) {
            Some(entry) => entry.state = state,
            None => {
                let stamp = self.next_stamp();
                self.insert_new(key.clone(), state, stamp);
            }
        }
    }

    fn next_stamp(&mut self) -> u64 {
        self.use_counter += 1;
        self.use_counter
    }

    fn insert_new(&mut self, key: CacheKey, state: AssetState<A>, stamp: u64) {
        self.entries.insert(
            key.clone(),
            CacheEntry {
                state,
                last_use: stamp,
            },
        );
        self.evict_if_needed(&key);
    }

    fn evict_if_needed(&mut self, protected: &CacheKey) -> Vec<CacheKey> {
        if self.entries.len() <= self.capacity {
            return Vec::new();
        }

        let mut by_age: Vec<(u64, &CacheKey)> = self
            .entries
            .iter()
            .filter(|(k, _)| *k != protected)
            .map(|(k, e)| (e.last_use, k))
            .collect();
        by_age.sort_unstable();

        let evicted: Vec<CacheKey> = by_age
            .into_iter()
            .take(self.eviction_batch)
            .map(|(_, k)| k.clone())
            .collect();
        for key in &evicted {
            self.entries.remove(key);
        }
        self.evicted_total += evicted.len() as u64;

        debug!(
            evicted = evicted.len(),
            remaining = self.entries.len(),
            capacity = self.capacity,
            "tile cache eviction pass"
        );
        evicted
    }
}
