//! Redis Cache Client
//!
//! Lazily connects to Redis on first use and absorbs every failure: a down
//! or slow backend reads as a miss, and writes are dropped. Only transport
//! failures and timeouts drop the connection; an error reply fails just
//! that command.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{debug, warn};

use super::Cache;
use crate::connection::{is_connection_failure, ConnectionStatus, LazyConnection};

/// Redis-backed cache client shared by all requests.
pub struct CacheClient {
    url: String,
    conn: LazyConnection<MultiplexedConnection>,
    /// Upper bound for a single GET/SET round trip
    op_timeout: Duration,
}

impl CacheClient {
    /// Creates an unconnected client; nothing touches the network until the
    /// first `get` or `set`.
    pub fn new(
        url: impl Into<String>,
        connect_timeout: Duration,
        op_timeout: Duration,
        retry_after: Duration,
    ) -> Self {
        Self {
            url: url.into(),
            conn: LazyConnection::new("cache", connect_timeout, retry_after),
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
impl Cache for CacheClient {
    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.connection().await?;

        match tokio::time::timeout(self.op_timeout, conn.get::<_, Option<String>>(key)).await {
            Ok(Ok(value)) => {
                debug!(key, hit = value.is_some(), "cache lookup");
                value
            }
            Ok(Err(e)) => {
                warn!(key, error = %e, "cache GET failed");
                if is_connection_failure(&e) {
                    self.conn.mark_unavailable().await;
                }
                None
            }
            Err(_) => {
                warn!(key, "cache GET timed out");
                self.conn.mark_unavailable().await;
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) {
        let Some(mut conn) = self.connection().await else {
            return;
        };

        let write = async {
            match ttl {
                Some(ttl) => conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1)).await,
                None => conn.set::<_, _, ()>(key, value).await,
            }
        };

        match tokio::time::timeout(self.op_timeout, write).await {
            Ok(Ok(())) => debug!(key, "cache set"),
            Ok(Err(e)) => {
                warn!(key, error = %e, "cache SET failed");
                if is_connection_failure(&e) {
                    self.conn.mark_unavailable().await;
                }
            }
            Err(_) => {
                warn!(key, "cache SET timed out");
                self.conn.mark_unavailable().await;
            }
        }
    }

    async fn status(&self) -> ConnectionStatus {
        self.conn.status().await
    }
}
