//! Orchestrator Statistics Module
//!
//! Tracks cache hits and misses plus request log outcomes.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Orchestrator Stats ==
/// Lock-free counters shared by all concurrent computations.
#[derive(Debug, Default)]
pub struct OrchestratorStats {
    hits: AtomicU64,
    misses: AtomicU64,
    records: AtomicU64,
    persistence_failures: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Results served straight from the cache
    pub hits: u64,
    /// Results that had to be computed
    pub misses: u64,
    /// Request log rows written
    pub records: u64,
    /// Request log writes that failed the request
    pub persistence_failures: u64,
}

impl OrchestratorStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persisted(&self) {
        self.records.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persistence_failure(&self) {
        self.persistence_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            records: self.records.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if nothing was computed yet.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
