//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Which cache implementation backs the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    /// Remote Redis, shared across instances
    Redis,
    /// Process-local map
    Memory,
}

impl FromStr for CacheBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(CacheBackendKind::Redis),
            "memory" => Ok(CacheBackendKind::Memory),
            other => Err(format!("unknown cache backend '{}'", other)),
        }
    }
}

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Cache implementation
    pub cache_backend: CacheBackendKind,
    /// Redis URL for the result cache
    pub redis_url: String,
    /// Expiry for cached results, None = never expire
    pub cache_ttl: Option<Duration>,
    /// Capacity of the in-process cache
    pub memory_cache_max_entries: usize,
    /// Redis URL for the event stream
    pub event_stream_url: String,
    /// Stream that request events are appended to
    pub event_stream_topic: String,
    /// Approximate maximum stream length
    pub event_stream_max_len: usize,
    /// SQLite file holding the request log
    pub database_path: String,
    /// HMAC secret for bearer tokens
    pub jwt_secret: String,
    /// Lifetime of issued tokens
    pub token_ttl: Duration,
    /// Bound on one connect attempt to cache or stream
    pub connect_timeout: Duration,
    /// Bound on one cache or stream command
    pub op_timeout: Duration,
    /// Bound on one request log write
    pub store_timeout: Duration,
    /// Wait before reconnecting to an unavailable backend
    pub retry_after: Duration,
    /// Largest exponent accepted by the power endpoint
    pub max_exponent: u32,
    /// Largest n accepted by fibonacci and factorial
    pub max_n: u64,
}

/// Upper bound for cache and token lifetimes (ten years).
pub const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Lifetime in seconds, clamped to `MAX_TTL_SECS`.
fn bounded_ttl(secs: u64) -> Duration {
    Duration::from_secs(secs.min(MAX_TTL_SECS))
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 5000)
    /// - `CACHE_BACKEND` - `redis` or `memory` (default: redis)
    /// - `REDIS_URL` - Cache URL (default: redis://localhost:6379/0)
    /// - `CACHE_TTL_SECS` - Cache expiry in seconds (default: none, capped at ten years)
    /// - `MEMORY_CACHE_MAX_ENTRIES` - In-process cache capacity (default: 10000)
    /// - `EVENT_STREAM_URL` - Stream URL (default: redis://localhost:6379/0)
    /// - `EVENT_STREAM_TOPIC` - Stream name (default: request_logs)
    /// - `EVENT_STREAM_MAXLEN` - Stream length cap (default: 10000)
    /// - `DATABASE_PATH` - SQLite file (default: instance/requests.db)
    /// - `JWT_SECRET` - Token signing secret
    /// - `TOKEN_TTL_SECS` - Token lifetime (default: 86400, capped at ten years)
    /// - `CONNECT_TIMEOUT_MS`, `OP_TIMEOUT_MS`, `STORE_TIMEOUT_MS`, `RETRY_AFTER_SECS`
    /// - `MAX_EXPONENT`, `MAX_N` - Argument limits (default: 10000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_env("SERVER_PORT").unwrap_or(defaults.server_port),
            cache_backend: parse_env("CACHE_BACKEND").unwrap_or(defaults.cache_backend),
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            cache_ttl: parse_env::<u64>("CACHE_TTL_SECS")
                .filter(|secs| *secs > 0)
                .map(bounded_ttl),
            memory_cache_max_entries: parse_env("MEMORY_CACHE_MAX_ENTRIES")
                .unwrap_or(defaults.memory_cache_max_entries),
            event_stream_url: env::var("EVENT_STREAM_URL").unwrap_or(defaults.event_stream_url),
            event_stream_topic: env::var("EVENT_STREAM_TOPIC")
                .unwrap_or(defaults.event_stream_topic),
            event_stream_max_len: parse_env("EVENT_STREAM_MAXLEN")
                .unwrap_or(defaults.event_stream_max_len),
            database_path: env::var("DATABASE_PATH").unwrap_or(defaults.database_path),
            jwt_secret: env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            token_ttl: parse_env("TOKEN_TTL_SECS")
                .map(bounded_ttl)
                .unwrap_or(defaults.token_ttl),
            connect_timeout: parse_env("CONNECT_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.connect_timeout),
            op_timeout: parse_env("OP_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.op_timeout),
            store_timeout: parse_env("STORE_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.store_timeout),
            retry_after: parse_env("RETRY_AFTER_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry_after),
            max_exponent: parse_env("MAX_EXPONENT").unwrap_or(defaults.max_exponent),
            max_n: parse_env("MAX_N").unwrap_or(defaults.max_n),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 5000,
            cache_backend: CacheBackendKind::Redis,
            redis_url: "redis://localhost:6379/0".to_string(),
            cache_ttl: None,
            memory_cache_max_entries: 10_000,
            event_stream_url: "redis://localhost:6379/0".to_string(),
            event_stream_topic: "request_logs".to_string(),
            event_stream_max_len: 10_000,
            database_path: "instance/requests.db".to_string(),
            jwt_secret: "super-secret-change-me".to_string(),
            token_ttl: Duration::from_secs(86_400),
            connect_timeout: Duration::from_millis(500),
            op_timeout: Duration::from_millis(250),
            store_timeout: Duration::from_secs(5),
            retry_after: Duration::from_secs(30),
            max_exponent: 10_000,
            max_n: 10_000,
        }
    }
}
