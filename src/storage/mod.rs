//! Storage Module
//!
//! Durable, append-only log of completed computations, plus the user
//! accounts that can log in. Unlike the cache and the event stream, a failed
//! write here fails the request.

mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::PersistenceError;

pub use sqlite::SqliteStore;

// == Request Log Record ==
/// One persisted computation. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestLogRecord {
    /// Store-assigned row id
    pub id: i64,
    /// Operation name (`pow`, `fib`, `factorial`)
    pub endpoint: String,
    /// Canonical arguments, comma-joined
    pub input: String,
    /// Decimal result
    pub result: String,
    /// Assigned when the row is written
    pub timestamp: DateTime<Utc>,
}

/// Fields supplied by the caller; the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRequestLog {
    pub endpoint: String,
    pub input: String,
    pub result: String,
}

// == Request Store Trait ==
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Persists the record. `Ok` means it survives a restart.
    async fn insert(&self, log: NewRequestLog) -> Result<RequestLogRecord, PersistenceError>;

    /// Most recent records first.
    async fn recent(&self, limit: usize) -> Result<Vec<RequestLogRecord>, PersistenceError>;
}

// == User Accounts ==
/// A login account. The password is only ever stored as an Argon2 PHC hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    /// Unique login name
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Adds an account; fails with `DuplicateUser` if the name is taken.
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<UserRecord, PersistenceError>;

    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>, PersistenceError>;
}
