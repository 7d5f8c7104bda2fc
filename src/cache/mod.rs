//! Cache Module
//!
//! Best-effort key/value memoization for computed results. Implementations
//! never surface errors: a backend problem reads as a miss and a write
//! becomes a no-op.

mod client;
mod entry;
mod memory;

use std::time::Duration;

use async_trait::async_trait;

use crate::connection::ConnectionStatus;

// Re-export public types
pub use client::CacheClient;
pub use entry::MemoryEntry;
pub use memory::MemoryCache;

// == Cache Trait ==
/// Fail-open key/value cache.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Returns the stored value, or None when missing or unreachable.
    async fn get(&self, key: &str) -> Option<String>;

    /// Stores the value if the backend is reachable, otherwise does nothing.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>);

    /// Connection state, for diagnostics.
    async fn status(&self) -> ConnectionStatus {
        ConnectionStatus::Connected
    }
}
