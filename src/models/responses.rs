//! Response DTOs for the math API
//!
//! Defines the structure of outgoing HTTP response bodies.

use num_bigint::BigInt;
use serde::{Serialize, Serializer};
use serde_json::value::RawValue;

use crate::connection::ConnectionStatus;
use crate::service::StatsSnapshot;

/// Response body for every math endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ResultResponse {
    #[serde(serialize_with = "serialize_integer")]
    pub result: BigInt,
}

impl ResultResponse {
    pub fn new(result: BigInt) -> Self {
        Self { result }
    }
}

/// Writes the integer as a bare JSON number of any length, so values beyond
/// 64 bits are not rounded through a float.
fn serialize_integer<S: Serializer>(value: &BigInt, serializer: S) -> Result<S::Ok, S::Error> {
    let raw = RawValue::from_string(value.to_string()).map_err(serde::ser::Error::custom)?;
    raw.serialize(serializer)
}

/// Response body for POST /auth/login
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Results served from the cache
    pub hits: u64,
    /// Results computed on a miss
    pub misses: u64,
    /// Request log rows written
    pub records: u64,
    /// Request log writes that failed
    pub persistence_failures: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Cache backend connection state
    pub cache: ConnectionStatus,
    /// Event stream connection state
    pub event_stream: ConnectionStatus,
}

impl StatsResponse {
    pub fn new(
        stats: StatsSnapshot,
        cache: ConnectionStatus,
        event_stream: ConnectionStatus,
    ) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            records: stats.records,
            persistence_failures: stats.persistence_failures,
            hit_rate: stats.hit_rate(),
            cache,
            event_stream,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_response_small() {
        let resp = ResultResponse::new(BigInt::from(256));
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"result":256}"#);
    }

    #[test]
    fn test_result_response_negative() {
        let resp = ResultResponse::new(BigInt::from(-27));
        assert_eq!(serde_json::to_string(&resp).unwrap(), r#"{"result":-27}"#);
    }

    #[test]
    fn test_result_response_keeps_all_digits() {
        let big: BigInt = "354224848179261915075".parse().unwrap();
        let json = serde_json::to_string(&ResultResponse::new(big)).unwrap();
        assert_eq!(json, r#"{"result":354224848179261915075}"#);
    }

    #[test]
    fn test_stats_response() {
        let snapshot = StatsSnapshot {
            hits: 80,
            misses: 20,
            records: 20,
            persistence_failures: 0,
        };
        let resp = StatsResponse::new(
            snapshot,
            ConnectionStatus::Connected,
            ConnectionStatus::Unavailable,
        );
        assert!((resp.hit_rate - 0.8).abs() < 0.001);

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["cache"], "connected");
        assert_eq!(json["event_stream"], "unavailable");
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }
}
