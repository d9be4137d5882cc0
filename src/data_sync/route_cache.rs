use crate::logic::graph::SwapPath;
use crate::logic::types::PoolFilter;
use crate::pools::SwapType;
use ahash::RandomState;
use alloy_primitives::{Address, B256};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

const MAX_ENTRIES: usize = 4096;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RouteCacheKey {
    pub token_in: Address,
    pub token_out: Address,
    pub swap_type: SwapType,
    pub timestamp: u64,
    // paths depend on these as well
    pub pool_type_filter: PoolFilter,
    pub max_pools: usize,
}

#[derive(Debug, Default)]
pub struct RouteCacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub invalidations: AtomicU64,
}

impl RouteCacheStats {
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 { 0.0 } else { hits as f64 / total as f64 }
    }
}

/// Prepared paths per request shape, valid for one pool snapshot.
///
/// Entries are dropped as soon as a snapshot with a different fingerprint is announced,
/// or once a request with a newer timestamp arrives.
#[derive(Debug, Default)]
pub struct RouteCache {
    entries: DashMap<RouteCacheKey, Arc<Vec<SwapPath>>, RandomState>,
    fingerprint: RwLock<Option<B256>>,
    latest_timestamp: AtomicU64,
    pub stats: RouteCacheStats,
}

impl RouteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &RouteCacheKey) -> Option<Arc<Vec<SwapPath>>> {
        match self.entries.get(key) {
            Some(paths) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(paths.value()))
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, key: RouteCacheKey, paths: Vec<SwapPath>) -> Arc<Vec<SwapPath>> {
        let previous = self.latest_timestamp.fetch_max(key.timestamp, Ordering::Relaxed);
        if key.timestamp > previous {
            self.entries.retain(|cached, _| cached.timestamp >= key.timestamp);
        }
        if self.entries.len() >= MAX_ENTRIES && !self.entries.contains_key(&key) {
            debug!("Route cache full at {} entries, clearing", MAX_ENTRIES);
            self.entries.clear();
        }
        let paths = Arc::new(paths);
        self.entries.insert(key, Arc::clone(&paths));
        paths
    }

    /// Record the fingerprint of the current snapshot, clearing every entry if it changed.
    /// Returns whether the cache was invalidated.
    pub fn observe_snapshot(&self, fingerprint: B256) -> bool {
        let mut current = match self.fingerprint.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *current == Some(fingerprint) {
            return false;
        }
        *current = Some(fingerprint);
        drop(current);
        self.invalidate();
        true
    }

    pub fn invalidate(&self) {
        let dropped = self.entries.len();
        self.entries.clear();
        self.stats.invalidations.fetch_add(1, Ordering::Relaxed);
        info!("Route cache invalidated, dropped {} entries", dropped);
    }

    /// Forget the snapshot as well as the entries.
    pub fn reset(&self) {
        match self.fingerprint.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
        self.latest_timestamp.store(0, Ordering::Relaxed);
        self.invalidate();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
