//! Caching layer for planned itineraries.
//!
//! A search depends only on the timetable snapshot, the resolved endpoints,
//! the start minute and the round budget, so results are cached under
//! exactly that key. Including the snapshot generation means a refresh can
//! never serve an itinerary computed against old data; stale generations
//! simply age out.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;

use crate::domain::{Itinerary, WeekMinute};
use crate::timetable::StopIdx;

/// Cache key: (snapshot generation, source, target, start, rounds).
pub type PlanKey = (u64, StopIdx, StopIdx, WeekMinute, usize);

/// Cached search result.
///
/// Endpoint distances are not part of the entry; two coordinates that snap
/// to the same stop share it.
#[derive(Debug, Clone)]
pub struct CachedPlan {
    pub earliest_arrival: Option<WeekMinute>,
    pub itinerary: Arc<Itinerary>,
    pub rounds: usize,
}

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_capacity: 10_000,
        }
    }
}

/// Cache for planned itineraries.
pub struct PlanCache {
    plans: MokaCache<PlanKey, CachedPlan>,
}

impl PlanCache {
    /// Create a new cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let plans = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self { plans }
    }

    /// Get a cached plan.
    pub async fn get(&self, key: &PlanKey) -> Option<CachedPlan> {
        self.plans.get(key).await
    }

    /// Insert a plan into the cache.
    pub async fn insert(&self, key: PlanKey, plan: CachedPlan) {
        self.plans.insert(key, plan).await;
    }

    /// Get cache statistics (for monitoring).
    ///
    /// Approximate until pending maintenance has run.
    pub fn entry_count(&self) -> u64 {
        self.plans.entry_count()
    }

    /// Invalidate all cached entries.
    pub fn invalidate_all(&self) {
        self.plans.invalidate_all();
    }
}
