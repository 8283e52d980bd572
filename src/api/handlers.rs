//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::cache::Cache;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    validate_id, ClearResponse, GetResponse, HealthResponse, SetRequest, SetResponse,
    StatsResponse, TimestampResponse,
};
use crate::origin::Origin;

/// Application state shared across all handlers.
///
/// The cache engine is internally shared, so cloning the state is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Tiered cache of origin JSON documents
    pub cache: Cache<Value>,
    /// Where misses are fetched from
    pub origin: Origin,
}

impl AppState {
    /// Creates a new AppState with the given cache and origin.
    pub fn new(cache: Cache<Value>, origin: Origin) -> Self {
        Self { cache, origin }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Selects the durable backend and points the origin at the upstream URL.
    pub fn from_config(config: &Config) -> Self {
        let cache = Cache::new(config.cache_options(), config.durable_store());
        Self::new(cache, Origin::new(config.upstream_url.clone()))
    }
}

fn check_id(id: &str) -> Result<()> {
    match validate_id(id) {
        Some(msg) => Err(CacheError::InvalidRequest(msg)),
        None => Ok(()),
    }
}

/// Handler for GET /get/*id
///
/// Answers from memory or durable storage when possible, otherwise waits for
/// the origin. Durable hits are refreshed in the background.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GetResponse>> {
    check_id(&id)?;

    let lookup = state.cache.get(state.origin.strategy(&id)).await?;

    Ok(Json(GetResponse::new(id, lookup.value, lookup.source)))
}

/// Handler for PUT /set
///
/// Saves a value into both tiers.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    // Validate request
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    state.cache.save(&req.id, req.value).await;

    Ok(Json(SetResponse::new(req.id)))
}

/// Handler for GET /timestamp/*id
pub async fn timestamp_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TimestampResponse>> {
    check_id(&id)?;

    let timestamp = state.cache.timestamp(&id);

    Ok(Json(TimestampResponse { id, timestamp }))
}

/// Handler for DELETE /clear
///
/// Removes every durable entry under the cache prefix. Values already in
/// memory keep being served.
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    Json(ClearResponse::new(state.cache.clear()))
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats().await;

    Json(StatsResponse::new(stats, state.cache.has_durable_store()))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
