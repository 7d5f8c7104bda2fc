//! Memory Cache Module
//!
//! In-process implementation of the cache contract with TTL expiry and a
//! bounded number of entries. Used for single-instance runs and tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{Cache, MemoryEntry};

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, MemoryEntry>,
    next_seq: u64,
}

// == Memory Cache ==
/// HashMap-backed cache; evicts the oldest insertion when full.
#[derive(Debug)]
pub struct MemoryCache {
    inner: Mutex<Inner>,
    /// Maximum number of entries allowed
    max_entries: usize,
}

impl MemoryCache {
    // == Constructor ==
    /// Creates an empty cache holding at most `max_entries` values.
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            max_entries: max_entries.max(1),
        }
    }

    // == Length ==
    /// Number of stored entries, expired ones included until touched.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave the map half-written.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let mut inner = self.lock();
        let entry = inner.entries.get(key)?;
        if !entry.is_expired() {
            return Some(entry.value.clone());
        }

        inner.entries.remove(key);
        debug!(key, "memory cache entry expired");
        None
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) {
        let mut inner = self.lock();
        let is_overwrite = inner.entries.contains_key(key);

        if !is_overwrite && inner.entries.len() >= self.max_entries {
            inner.entries.retain(|_, entry| !entry.is_expired());
        }

        if !is_overwrite && inner.entries.len() >= self.max_entries {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.seq)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                inner.entries.remove(&oldest);
                debug!(key = %oldest, "memory cache evicted oldest entry");
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner
            .entries
            .insert(key.to_string(), MemoryEntry::new(value.to_string(), seq, ttl));
    }
}
