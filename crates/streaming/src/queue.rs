use std::collections::HashSet;

use layers::LayerId;
use runtime::work_queue::WorkQueue;
use tracing::{debug, warn};

use crate::cache::TileCache;
use crate::error::AssetLoadError;
use crate::request::{CacheKey, LoadJob};

/// Default cap on concurrently running fetches.
pub const DEFAULT_MAX_INFLIGHT: usize = 6;

/// Cumulative fetch counters.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct QueueCounters {
    pub dispatched: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// Deduplicated FIFO of fetch jobs dispatched under a concurrency cap.
///
/// The queue never performs I/O itself: [`LoadQueue::pump`] hands back the
/// jobs that were just started, and the caller reports each outcome through
/// [`LoadQueue::complete`], which pumps again so the queue keeps draining.
///
/// A cache key is never queued twice, and never queued while its fetch is
/// in flight, even if the cache entry was evicted in the meantime.
#[derive(Debug)]
pub struct LoadQueue {
    max_inflight: usize,
    queue: WorkQueue<CacheKey, LoadJob>,
    inflight: HashSet<CacheKey>,
    counters: QueueCounters,
}

impl LoadQueue {
    /// `max_inflight` is raised to at least 1.
    pub fn new(max_inflight: usize) -> Self {
        Self {
            max_inflight: max_inflight.max(1),
            queue: WorkQueue::new(),
            inflight: HashSet::new(),
            counters: QueueCounters::default(),
        }
    }

    pub fn max_inflight(&self) -> usize {
        self.max_inflight
    }

    pub fn inflight(&self) -> usize {
        self.inflight.len()
    }

    pub fn is_inflight(&self, key: &CacheKey) -> bool {
        self.inflight.contains(key)
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn is_queued(&self, key: &CacheKey) -> bool {
        self.queue.contains(key)
    }

    pub fn counters(&self) -> QueueCounters {
        self.counters
    }

    /// Queues a fetch unless the asset was already requested.
    ///
    /// No-op when the entry is pending, loaded or failed, or when the key is
    /// already queued. Touches the cache entry either way. Returns whether a
    /// job was queued.
    pub fn enqueue<A>(
        &mut self,
        cache: &mut TileCache<A>,
        layer_id: &LayerId,
        asset_key: &str,
    ) -> bool {
        let job = LoadJob::new(layer_id.clone(), asset_key);
        if !cache.get(&job.cache_key).is_unrequested() {
            return false;
        }
        if self.inflight.contains(&job.cache_key) {
            return false;
        }
        self.queue.push(job.cache_key.clone(), job)
    }

    /// Starts queued jobs until the concurrency cap is reached.
    ///
    /// Each started job's cache entry turns `Pending`. Returns the started
    /// jobs in queue order; the caller must run each one and report back via
    /// [`LoadQueue::complete`].
    pub fn pump<A>(&mut self, cache: &mut TileCache<A>) -> Vec<LoadJob> {
        let mut started = Vec::new();
        while self.inflight.len() < self.max_inflight {
            let Some((key, job)) = self.queue.pop() else {
                break;
            };
            if self.inflight.contains(&key) || !cache.get(&key).is_unrequested() {
                continue;
            }
            cache.mark_pending(&key);
            self.inflight.insert(key);
            self.counters.dispatched += 1;
            debug!(key = %job.cache_key, inflight = self.inflight.len(), "fetch dispatched");
            started.push(job);
        }
        started
    }

    /// Records the outcome of a dispatched job, then pumps.
    ///
    /// Outcomes for jobs this queue did not dispatch are ignored.
    pub fn complete<A>(
        &mut self,
        cache: &mut TileCache<A>,
        job: &LoadJob,
        result: Result<A, AssetLoadError>,
    ) -> Vec<LoadJob> {
        if !self.inflight.remove(&job.cache_key) {
            warn!(key = %job.cache_key, "completion for a fetch that is not in flight");
            return Vec::new();
        }

        match &result {
            Ok(_) => {
                self.counters.succeeded += 1;
                debug!(key = %job.cache_key, "fetch succeeded");
            }
            Err(err) => {
                self.counters.failed += 1;
                warn!(key = %job.cache_key, error = %err, "fetch failed");
            }
        }
        cache.put(&job.cache_key, result);
        self.pump(cache)
    }
}

impl Default for LoadQueue {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INFLIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::LoadQueue;
    use crate::cache::TileCache;
    use crate::error::AssetLoadError;
    use crate::request::CacheKey;
    use crate::residency::AssetState;
    use layers::LayerId;
    use pretty_assertions::assert_eq;

    fn layer() -> LayerId {
        LayerId::new("c1")
    }

    fn key(asset: &str) -> CacheKey {
        CacheKey::new(layer(), asset)
    }

    #[test]
    fn pump_respects_concurrency_cap() {
        let mut cache: TileCache<u32> = TileCache::with_capacity(64);
        let mut q = LoadQueue::new(2);
        for asset in ["A1", "A2", "A3", "A4", "A5"] {
            assert!(q.enqueue(&mut cache, &layer(), asset));
        }

        let started = q.pump(&mut cache);
        assert_eq!(started.len(), 2);
        assert_eq!(q.inflight(), 2);
        assert_eq!(q.queued(), 3);
        assert_eq!(cache.peek(&key("A1")), Some(&AssetState::Pending));
        assert_eq!(cache.peek(&key("A3")), Some(&AssetState::Unrequested));

        // Pumping again without completions starts nothing.
        assert!(q.pump(&mut cache).is_empty());

        let next = q.complete(&mut cache, &started[0], Ok(1));
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].asset_key, "A3");
        assert_eq!(q.inflight(), 2);
        assert_eq!(q.queued(), 2);
    }

    #[test]
    fn inflight_never_exceeds_cap_while_draining() {
        let mut cache: TileCache<u32> = TileCache::with_capacity(64);
        let mut q = LoadQueue::new(3);
        for i in 0..20 {
            q.enqueue(&mut cache, &layer(), &format!("A{i}"));
        }

        let mut running = q.pump(&mut cache);
        let mut finished = 0;
        while let Some(job) = running.pop() {
            assert!(q.inflight() <= 3);
            let more = q.complete(&mut cache, &job, Ok(finished));
            assert!(q.inflight() <= 3);
            running.extend(more);
            finished += 1;
        }
        assert_eq!(finished, 20);
        assert_eq!(q.counters().dispatched, 20);
        assert_eq!(q.counters().succeeded, 20);
        assert_eq!(q.inflight(), 0);
    }

    #[test]
    fn duplicate_enqueue_yields_one_job() {
        let mut cache: TileCache<u32> = TileCache::with_capacity(8);
        let mut q = LoadQueue::new(4);
        assert!(q.enqueue(&mut cache, &layer(), "A1"));
        assert!(!q.enqueue(&mut cache, &layer(), "A1"));
        assert_eq!(q.queued(), 1);

        let started = q.pump(&mut cache);
        assert_eq!(started.len(), 1);

        // Pending: still a no-op.
        assert!(!q.enqueue(&mut cache, &layer(), "A1"));
        assert_eq!(q.queued(), 0);
    }

    #[test]
    fn settled_entries_are_not_refetched() {
        let mut cache: TileCache<u32> = TileCache::with_capacity(8);
        let mut q = LoadQueue::new(4);
        q.enqueue(&mut cache, &layer(), "A1");
        q.enqueue(&mut cache, &layer(), "A2");
        let started = q.pump(&mut cache);
        q.complete(&mut cache, &started[0], Ok(5));
        q.complete(&mut cache, &started[1], Err(AssetLoadError::new("404")));

        assert!(!q.enqueue(&mut cache, &layer(), "A1"));
        assert!(!q.enqueue(&mut cache, &layer(), "A2"));
        assert_eq!(cache.peek(&key("A1")), Some(&AssetState::Ready(5)));
        assert_eq!(
            cache.peek(&key("A2")).and_then(|s| s.last_error()),
            Some(&AssetLoadError::new("404"))
        );
        assert_eq!(q.counters().failed, 1);
    }

    #[test]
    fn failed_entry_is_retried_after_eviction() {
        let mut cache: TileCache<u32> = TileCache::new(1, 0.2);
        let mut q = LoadQueue::new(1);
        q.enqueue(&mut cache, &layer(), "A1");
        let started = q.pump(&mut cache);
        q.complete(&mut cache, &started[0], Err(AssetLoadError::new("boom")));

        // Touching another key evicts the failed entry.
        cache.get(&key("B1"));
        assert!(!cache.contains(&key("A1")));
        assert!(q.enqueue(&mut cache, &layer(), "A1"));
    }

    #[test]
    fn evicted_pending_entry_is_not_dispatched_twice() {
        let mut cache: TileCache<u32> = TileCache::new(1, 0.2);
        let mut q = LoadQueue::new(2);
        q.enqueue(&mut cache, &layer(), "A1");
        let started = q.pump(&mut cache);
        cache.get(&key("B1"));
        assert!(!cache.contains(&key("A1")));

        assert!(!q.enqueue(&mut cache, &layer(), "A1"));
        assert!(q.pump(&mut cache).is_empty());

        q.complete(&mut cache, &started[0], Ok(9));
        assert_eq!(cache.peek(&key("A1")), Some(&AssetState::Ready(9)));
    }

    #[test]
    fn unknown_completion_is_ignored() {
        let mut cache: TileCache<u32> = TileCache::with_capacity(8);
        let mut q = LoadQueue::new(2);
        let stray = crate::request::LoadJob::new(layer(), "Z9");
        assert!(q.complete(&mut cache, &stray, Ok(1)).is_empty());
        assert!(cache.peek(&key("Z9")).is_none());
        assert_eq!(q.counters().succeeded, 0);
    }
}
