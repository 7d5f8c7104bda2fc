//! Memory Cache Entry Module
//!
//! Defines a single in-process cache entry with optional expiry.

use std::time::{Duration, Instant};

// == Memory Entry ==
/// A stored value plus the metadata the in-process cache needs for expiry
/// and eviction.
#[derive(Debug, Clone)]
pub struct MemoryEntry {
    /// The stored value
    pub value: String,
    /// Insertion sequence number, lower is older
    pub seq: u64,
    /// Expiration instant, None = no expiration
    pub expires_at: Option<Instant>,
}

impl MemoryEntry {
    // == Constructor ==
    /// Creates a new entry that expires after `ttl`, if given.
    ///
    /// A deadline too far out to represent as an `Instant` means no expiry.
    pub fn new(value: String, seq: u64, ttl: Option<Duration>) -> Self {
        Self {
            value,
            seq,
            expires_at: ttl.and_then(|ttl| Instant::now().checked_add(ttl)),
        }
    }

    // == Is Expired ==
    /// An entry is expired once the current instant reaches its deadline.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }
}
