//! Process-wide TTL cache for computed recommendation lists.
//!
//! Keys are the exact query tuple joined deterministically by the caller;
//! no normalization happens here. Entries expire after a fixed TTL and are
//! evicted lazily on access. Freshly ingested posts do not invalidate
//! entries; results may be stale for up to one TTL window, an accepted
//! bound. Concurrent identical misses may each recompute. Recomputation is
//! read-only and idempotent, and the last write wins with an identical
//! value.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use crate::error::Result;
use crate::models::RecommendationEntry;

#[derive(Debug, Clone)]
struct CachedEntry {
    entries: Vec<RecommendationEntry>,
    expires_at: Instant,
}

impl CachedEntry {
    fn new(entries: Vec<RecommendationEntry>, ttl: Duration) -> Self {
        Self {
            entries,
            expires_at: Instant::now() + ttl,
        }
    }

    #[inline]
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Cache performance counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

pub struct RecommendationCache {
    store: DashMap<String, CachedEntry>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl RecommendationCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            store: DashMap::new(),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Return the cached list for `key`, or compute, store, and return it.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: String,
        compute: F,
    ) -> Result<Vec<RecommendationEntry>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<RecommendationEntry>>>,
    {
        if let Some(entry) = self.store.get(&key) {
            if !entry.is_expired() {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Recommendation cache HIT");
                return Ok(entry.entries.clone());
            }
            drop(entry);
            if self.store.remove(&key).is_some() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, "Recommendation cache MISS");

        let entries = compute().await?;
        if !self.ttl.is_zero() {
            self.store
                .insert(key, CachedEntry::new(entries.clone(), self.ttl));
        }
        Ok(entries)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.store.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    pub fn clear(&self) {
        self.store.clear();
    }
}
