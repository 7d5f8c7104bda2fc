//! Redis Streams Publisher
//!
//! Appends events with `XADD` on a lazily established connection. A message
//! that cannot be sent is dropped; nothing is buffered or retried.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tracing::{debug, warn};

use super::{EventSink, StreamEvent};
use crate::connection::{is_connection_failure, ConnectionStatus, LazyConnection};

/// Field under which the JSON payload is stored in each stream entry.
const PAYLOAD_FIELD: &str = "payload";

/// Publisher to Redis Streams, shared by all requests.
pub struct EventStreamClient {
    url: String,
    conn: LazyConnection<MultiplexedConnection>,
    /// Approximate cap on stream length (`MAXLEN ~`)
    max_len: usize,
    /// Upper bound for a single XADD round trip
    op_timeout: Duration,
}

impl EventStreamClient {
    /// Creates an unconnected publisher.
    pub fn new(
        url: impl Into<String>,
        max_len: usize,
        connect_timeout: Duration,
        op_timeout: Duration,
        retry_after: Duration,
    ) -> Self {
        Self {
            url: url.into(),
            conn: LazyConnection::new("event_stream", connect_timeout, retry_after),
            max_len,
            op_timeout,
        }
    }

    async fn connection(&self) -> Option<MultiplexedConnection> {
        self.conn
            .get(|| async {
                let client = redis::Client::open(self.url.as_str())?;
                let mut conn = client.get_multiplexed_async_connection().await?;
                let _: String = redis::cmd("PING").query_async(&mut conn).await?;
                Ok::<_, redis::RedisError>(conn)
            })
            .await
    }
}

#[async_trait]
impl EventSink for EventStreamClient {
    async fn send(&self, topic: &str, event: &StreamEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(topic, error = %e, "failed to serialize stream event");
                return;
            }
        };

        let Some(mut conn) = self.connection().await else {
            debug!(topic, "event stream unavailable, dropping event");
            return;
        };

        let mut xadd = redis::cmd("XADD");
        xadd.arg(topic)
            .arg("MAXLEN")
            .arg("~")
            .arg(self.max_len)
            .arg("*")
            .arg(PAYLOAD_FIELD)
            .arg(payload);

        let publish = async {
            let id: String = xadd.query_async(&mut conn).await?;
            Ok::<_, redis::RedisError>(id)
        };

        match tokio::time::timeout(self.op_timeout, publish).await {
            Ok(Ok(id)) => debug!(topic, id = %id, "event published"),
            Ok(Err(e)) => {
                warn!(topic, error = %e, "event publish failed, dropping event");
                if is_connection_failure(&e) {
                    self.conn.mark_unavailable().await;
                }
            }
            Err(_) => {
                warn!(topic, "event publish timed out, dropping event");
                self.conn.mark_unavailable().await;
            }
        }
    }

    async fn status(&self) -> ConnectionStatus {
        self.conn.status().await
    }
}
