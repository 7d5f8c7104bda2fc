//! Request Recorder
//!
//! Writes the durable request log row, then mirrors it to the event stream.

use std::sync::Arc;

use tracing::error;

use crate::error::PersistenceError;
use crate::storage::{NewRequestLog, RequestLogRecord, RequestStore};
use crate::stream::{EventSink, StreamEvent};

/// Persists one record per computation and forwards it to the event stream.
#[derive(Clone)]
pub struct RequestRecorder {
    store: Arc<dyn RequestStore>,
    events: Arc<dyn EventSink>,
    /// Stream topic every event is published to
    topic: String,
}

impl RequestRecorder {
    pub fn new(
        store: Arc<dyn RequestStore>,
        events: Arc<dyn EventSink>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            store,
            events,
            topic: topic.into(),
        }
    }

    /// Persists the record, then publishes it.
    ///
    /// The insert must succeed; the publish is attempted only afterwards and
    /// its outcome is ignored.
    pub async fn record(
        &self,
        endpoint: &str,
        input: &str,
        result: &str,
    ) -> Result<RequestLogRecord, PersistenceError> {
        let log = NewRequestLog {
            endpoint: endpoint.to_string(),
            input: input.to_string(),
            result: result.to_string(),
        };

        let record = self.store.insert(log).await.map_err(|e| {
            error!(endpoint, input, error = %e, "failed to persist request log");
            e
        })?;

        self.events
            .send(&self.topic, &StreamEvent::from(&record))
            .await;

        Ok(record)
    }

    /// Access to the underlying store, for history listings.
    pub fn store(&self) -> &Arc<dyn RequestStore> {
        &self.store
    }
}
