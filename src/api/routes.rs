//! API Routes
//!
//! Configures the Axum router with all math service endpoints.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::auth::require_bearer;
use super::handlers::{
    factorial_handler, fib_handler, health_handler, login_handler, metrics_handler, pow_handler,
    stats_handler, AppState,
};
use crate::metrics::track_http;

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - Bearer token check on `/api/math/*`
/// - Request count and latency per route, exported at `/metrics`
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let math = Router::new()
        .route("/pow", get(pow_handler))
        .route("/fib", get(fib_handler))
        .route("/factorial", get(factorial_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .nest("/api/math", math)
        .route("/auth/login", post(login_handler))
        .route("/stats", get(stats_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .layer(middleware::from_fn(track_http))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
