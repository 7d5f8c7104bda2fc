//! Lazy Connection Module
//!
//! Deferred, failure-absorbing connection slot shared by the dependency
//! clients. The first caller attempts the connection; concurrent callers
//! wait on the same lock and adopt its outcome.

use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

// == Connection Status ==
/// Externally visible state of a lazy connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No attempt has been made yet
    Unconnected,
    /// A live handle is cached and reused
    Connected,
    /// The last attempt (or the last command) failed
    Unavailable,
}

enum Slot<T> {
    Unconnected,
    Connected(T),
    Unavailable { since: Instant },
}

// == Lazy Connection ==
/// Holds at most one live connection handle of type `T`.
///
/// `T` is expected to be a cheap, cloneable handle (e.g. a multiplexed
/// connection). The slot never surfaces connect errors; it only answers
/// "here is a handle" or "none right now".
pub struct LazyConnection<T> {
    /// Name used in log lines
    name: &'static str,
    slot: Mutex<Slot<T>>,
    /// Upper bound for a single connect attempt
    connect_timeout: Duration,
    /// Minimum time spent in Unavailable before trying again
    retry_after: Duration,
}

impl<T: Clone> LazyConnection<T> {
    /// Creates an unconnected slot.
    pub fn new(name: &'static str, connect_timeout: Duration, retry_after: Duration) -> Self {
        Self {
            name,
            slot: Mutex::new(Slot::Unconnected),
            connect_timeout,
            retry_after,
        }
    }

    /// Returns the cached handle, connecting first if needed.
    ///
    /// `connect` is only invoked when the slot is Unconnected, or Unavailable
    /// for at least `retry_after`. The lock is held across the attempt so
    /// racing callers converge on a single result.
    pub async fn get<F, Fut, E>(&self, connect: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut slot = self.slot.lock().await;
        match &*slot {
            Slot::Connected(handle) => return Some(handle.clone()),
            Slot::Unavailable { since } if since.elapsed() < self.retry_after => return None,
            _ => {}
        }

        match tokio::time::timeout(self.connect_timeout, connect()).await {
            Ok(Ok(handle)) => {
                info!(backend = self.name, "connection established");
                *slot = Slot::Connected(handle.clone());
                Some(handle)
            }
            Ok(Err(e)) => {
                warn!(backend = self.name, error = %e, "connection failed, continuing without it");
                *slot = Slot::Unavailable {
                    since: Instant::now(),
                };
                None
            }
            Err(_) => {
                warn!(
                    backend = self.name,
                    timeout_ms = self.connect_timeout.as_millis() as u64,
                    "connection attempt timed out, continuing without it"
                );
                *slot = Slot::Unavailable {
                    since: Instant::now(),
                };
                None
            }
        }
    }

    /// Drops the cached handle after a failed command.
    ///
    /// The next attempt happens once `retry_after` has elapsed.
    pub async fn mark_unavailable(&self) {
        let mut slot = self.slot.lock().await;
        if matches!(*slot, Slot::Connected(_)) {
            warn!(backend = self.name, "dropping connection after command failure");
        }
        *slot = Slot::Unavailable {
            since: Instant::now(),
        };
    }

    /// Current state of the slot.
    pub async fn status(&self) -> ConnectionStatus {
        match &*self.slot.lock().await {
            Slot::Unconnected => ConnectionStatus::Unconnected,
            Slot::Connected(_) => ConnectionStatus::Connected,
            Slot::Unavailable { .. } => ConnectionStatus::Unavailable,
        }
    }
}

// == Failure Classification ==
/// Whether a Redis command error means the connection itself is gone.
///
/// Server error replies (WRONGTYPE, OOM, bad arguments) arrive over a
/// healthy connection and only fail the one command.
pub fn is_connection_failure(e: &redis::RedisError) -> bool {
    e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
}
