//! API Handlers
//!
//! HTTP request handlers for each math service endpoint.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use tracing::{debug, error, info};

use super::auth::verify_password;
use super::TokenAuthority;
use crate::cache::{Cache, CacheClient, MemoryCache};
use crate::config::{CacheBackendKind, Config};
use crate::error::{ApiError, Result};
use crate::math::{Computation, PureMath};
use crate::metrics::render_metrics;
use crate::models::requests::LOGIN_ERROR;
use crate::models::{
    HealthResponse, InputLimits, LoginRequest, LoginResponse, NQuery, PowQuery, ResultResponse,
    StatsResponse,
};
use crate::service::{ComputationOrchestrator, RequestRecorder};
use crate::storage::{SqliteStore, UserStore};
use crate::stream::{EventSink, EventStreamClient};

const BAD_CREDENTIALS: &str = "Bad username or password";

/// Application state shared across all handlers.
///
/// The orchestrator owns the cache and request recorder; the event sink is
/// kept here as well so its connection state can be reported.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ComputationOrchestrator>,
    pub events: Arc<dyn EventSink>,
    pub users: Arc<dyn UserStore>,
    pub auth: Arc<TokenAuthority>,
    pub limits: InputLimits,
}

impl AppState {
    /// Creates a new AppState from already constructed parts.
    pub fn new(
        orchestrator: Arc<ComputationOrchestrator>,
        events: Arc<dyn EventSink>,
        users: Arc<dyn UserStore>,
        auth: Arc<TokenAuthority>,
        limits: InputLimits,
    ) -> Self {
        Self {
            orchestrator,
            events,
            users,
            auth,
            limits,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Opens the request log database. Cache and event stream clients are
    /// created unconnected and connect on first use.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let cache: Arc<dyn Cache> = match config.cache_backend {
            CacheBackendKind::Redis => Arc::new(CacheClient::new(
                config.redis_url.clone(),
                config.connect_timeout,
                config.op_timeout,
                config.retry_after,
            )),
            CacheBackendKind::Memory => Arc::new(MemoryCache::new(config.memory_cache_max_entries)),
        };
        info!("Cache backend: {:?}", config.cache_backend);

        let events: Arc<dyn EventSink> = Arc::new(EventStreamClient::new(
            config.event_stream_url.clone(),
            config.event_stream_max_len,
            config.connect_timeout,
            config.op_timeout,
            config.retry_after,
        ));

        let store = Arc::new(
            SqliteStore::open(&config.database_path, config.store_timeout)
                .with_context(|| format!("failed to open database at {}", config.database_path))?,
        );

        let recorder = RequestRecorder::new(
            store.clone(),
            events.clone(),
            config.event_stream_topic.clone(),
        );
        let orchestrator =
            ComputationOrchestrator::new(cache, Arc::new(PureMath), recorder, config.cache_ttl);

        Ok(Self::new(
            Arc::new(orchestrator),
            events,
            store,
            Arc::new(TokenAuthority::new(&config.jwt_secret, config.token_ttl)),
            InputLimits {
                max_exponent: config.max_exponent,
                max_n: config.max_n,
            },
        ))
    }
}

async fn run(state: &AppState, computation: Computation) -> Result<Json<ResultResponse>> {
    let result = state.orchestrator.compute(&computation).await?;
    Ok(Json(ResultResponse::new(result)))
}

/// Handler for GET /api/math/pow
pub async fn pow_handler(
    State(state): State<AppState>,
    Query(query): Query<PowQuery>,
) -> Result<Json<ResultResponse>> {
    let computation = query
        .validate(&state.limits)
        .map_err(ApiError::InvalidRequest)?;
    run(&state, computation).await
}

/// Handler for GET /api/math/fib
pub async fn fib_handler(
    State(state): State<AppState>,
    Query(query): Query<NQuery>,
) -> Result<Json<ResultResponse>> {
    let computation = query
        .fibonacci(&state.limits)
        .map_err(ApiError::InvalidRequest)?;
    run(&state, computation).await
}

/// Handler for GET /api/math/factorial
pub async fn factorial_handler(
    State(state): State<AppState>,
    Query(query): Query<NQuery>,
) -> Result<Json<ResultResponse>> {
    let computation = query
        .factorial(&state.limits)
        .map_err(ApiError::InvalidRequest)?;
    run(&state, computation).await
}

/// Handler for POST /auth/login
///
/// Exchanges a username and password for a bearer token.
pub async fn login_handler(
    State(state): State<AppState>,
    body: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>> {
    let Json(login) = body.map_err(|e| {
        debug!(error = %e, "unreadable login body");
        ApiError::InvalidRequest(LOGIN_ERROR.to_string())
    })?;
    let (username, password) = login.credentials().map_err(ApiError::InvalidRequest)?;

    let user = state.users.find_user(username).await.map_err(|e| {
        error!(username, error = %e, "user lookup failed");
        ApiError::Internal("Login is temporarily unavailable".to_string())
    })?;
    let Some(user) = user else {
        debug!(username, "login for unknown user");
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
    };

    // Argon2 verification is CPU-bound.
    let password = password.to_string();
    let hash = user.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| {
            error!(error = %e, "password verification task failed");
            ApiError::Internal("Login is temporarily unavailable".to_string())
        })?;
    if !valid {
        debug!(username = %user.username, "login with wrong password");
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
    }

    let access_token = state.auth.issue(&user.username).map_err(|e| {
        error!(error = %e, "failed to sign token");
        ApiError::Internal("Login is temporarily unavailable".to_string())
    })?;
    info!(username = %user.username, "login succeeded");

    Ok(Json(LoginResponse { access_token }))
}

/// Handler for GET /metrics
///
/// Prometheus text exposition; empty until the recorder is installed.
pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        render_metrics().unwrap_or_default(),
    )
}

/// Handler for GET /stats
///
/// Returns orchestrator counters and dependency connection state.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.orchestrator.stats(),
        state.orchestrator.cache_status().await,
        state.events.status().await,
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
