//! Math Service - token-gated integer computations
//!
//! Serves power, Fibonacci and factorial results through a cache-aside
//! pipeline backed by a durable request log and a best-effort event stream.

pub mod api;
pub mod cache;
pub mod config;
pub mod connection;
pub mod error;
pub mod math;
pub mod metrics;
pub mod models;
pub mod service;
pub mod storage;
pub mod stream;

#[cfg(test)]
mod fake_redis;

pub use api::AppState;
pub use config::Config;
pub use math::Computation;
pub use service::ComputationOrchestrator;
