//! API Module
//!
//! HTTP handlers and routing for the math service REST API.
//!
//! # Endpoints
//! - `GET /api/math/pow?base=&exp=` - Power (bearer token required)
//! - `GET /api/math/fib?n=` - Fibonacci number (bearer token required)
//! - `GET /api/math/factorial?n=` - Factorial (bearer token required)
//! - `POST /auth/login` - Exchange username and password for a bearer token
//! - `GET /stats` - Orchestrator statistics
//! - `GET /metrics` - Prometheus metrics
//! - `GET /health` - Health check endpoint

pub mod auth;
pub mod handlers;
pub mod routes;

pub use auth::TokenAuthority;
pub use handlers::*;
pub use routes::create_router;
