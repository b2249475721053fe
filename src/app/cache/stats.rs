//! Cache statistics
//!
//! Counters are kept as atomics on the cache and copied into a
//! [`CacheStats`] snapshot on request.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Point-in-time cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Cached applications
    pub entries: usize,
    /// Translation mappings
    pub translation_entries: usize,
    /// Reads served from the cache
    pub hits: u64,
    /// Reads that required a synchronous refresh
    pub misses: u64,
    /// Completed refreshes of any kind
    pub refreshes: u64,
    /// Background refreshes started
    pub background_refreshes: u64,
    /// Entries removed to stay under the cap
    pub evictions: u64,
    /// Entries removed after expiring
    pub expirations: u64,
}

impl CacheStats {
    /// Fraction of reads served from the cache, as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        (self.hits as f64 / total as f64) * 100.0
    }
}

/// Live counters backing [`CacheStats`]
#[derive(Debug, Default)]
pub struct StatsCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    refreshes: AtomicU64,
    background_refreshes: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl StatsCounters {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_background_refresh(&self) {
        self.background_refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: usize) {
        self.evictions.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_expirations(&self, count: usize) {
        self.expirations.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Copy the counters into a snapshot
    pub fn snapshot(&self, entries: usize, translation_entries: usize) -> CacheStats {
        CacheStats {
            entries,
            translation_entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            background_refreshes: self.background_refreshes.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_snapshot() {
        let counters = StatsCounters::default();
        counters.record_hit();
        counters.record_hit();
        counters.record_hit();
        counters.record_miss();
        counters.record_evictions(2);

        let stats = counters.snapshot(4, 3);
        assert_eq!(stats.entries, 4);
        assert_eq!(stats.translation_entries, 3);
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.evictions, 2);
        assert_eq!(stats.hit_rate(), 75.0);
    }

    #[test]
    fn test_empty_hit_rate() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
