//! Event Stream Module
//!
//! Best-effort publication of request events to an append-only stream.

mod client;

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::connection::ConnectionStatus;
use crate::storage::RequestLogRecord;

pub use client::EventStreamClient;

// == Stream Event ==
/// Transient copy of a request log record, published once per computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub endpoint: String,
    pub input: String,
    pub result: String,
}

impl From<&RequestLogRecord> for StreamEvent {
    fn from(record: &RequestLogRecord) -> Self {
        Self {
            endpoint: record.endpoint.clone(),
            input: record.input.clone(),
            result: record.result.clone(),
        }
    }
}

// == Event Sink Trait ==
/// Fire-and-forget publisher. Failures are absorbed by the implementation.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn send(&self, topic: &str, event: &StreamEvent);

    /// Connection state, for diagnostics.
    async fn status(&self) -> ConnectionStatus {
        ConnectionStatus::Connected
    }
}

// == Memory Sink ==
/// Keeps published events in memory, in publication order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<(String, StreamEvent)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything sent so far as `(topic, event)` pairs.
    pub fn events(&self) -> Vec<(String, StreamEvent)> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventSink for MemorySink {
    async fn send(&self, topic: &str, event: &StreamEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push((topic.to_string(), event.clone()));
        }
    }
}
