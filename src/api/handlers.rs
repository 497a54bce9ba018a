//! API Handlers
//!
//! HTTP request handlers for each key-value server endpoint.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;

use crate::cache::CacheStore;
use crate::config::Config;
use crate::coordinator::{Coordinator, Removal};
use crate::db::KvBackend;
use crate::error::Result;
use crate::models::{
    ErrorResponse, GetResponse, HealthResponse, KvRequest, MessageResponse, StatsResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Cache and database coordinator
    pub coordinator: Coordinator,
}

impl AppState {
    pub fn new(coordinator: Coordinator) -> Self {
        Self { coordinator }
    }

    /// Creates a new AppState with a cache sized from configuration.
    pub fn from_config(config: &Config, backend: Arc<dyn KvBackend>) -> Self {
        Self::new(Coordinator::new(CacheStore::new(config.cache_capacity), backend))
    }
}

/// Logs the final status of a request.
fn log_outcome<T>(method: &str, key: &str, result: &Result<T>, success: StatusCode) {
    match result {
        Ok(_) => info!(method, key, status = success.as_u16(), "request handled"),
        Err(e) => info!(method, key, status = e.status().as_u16(), error = %e, "request rejected"),
    }
}

/// Handler for GET /kv/:key
///
/// Answers from the cache when possible, otherwise reads through.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let result = state.coordinator.read(&key).await;
    match &result {
        Ok(lookup) => info!(
            method = "GET",
            key = %key,
            status = 200,
            source = lookup.source.as_str(),
            "request handled"
        ),
        Err(_) => log_outcome("GET", &key, &result, StatusCode::OK),
    }

    let lookup = result?;
    Ok(Json(GetResponse::new(key, lookup)))
}

/// Handler for POST /kv/:key
///
/// Creates a new record. The body must be `{"key": .., "value": ..}`.
pub async fn create_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    let result = match KvRequest::parse(&body).and_then(KvRequest::into_value) {
        Ok(value) => state.coordinator.create(&key, &value).await,
        Err(e) => Err(e),
    };
    log_outcome("POST", &key, &result, StatusCode::CREATED);

    result?;
    Ok((StatusCode::CREATED, Json(MessageResponse::created(key))))
}

/// Handler for PUT /kv/:key
///
/// Updates an existing record.
pub async fn update_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Bytes,
) -> Result<Json<MessageResponse>> {
    let result = match KvRequest::parse(&body).and_then(KvRequest::into_value) {
        Ok(value) => state.coordinator.update(&key, &value).await,
        Err(e) => Err(e),
    };
    log_outcome("PUT", &key, &result, StatusCode::OK);

    result?;
    Ok(Json(MessageResponse::updated(key)))
}

/// Handler for DELETE /kv/:key
///
/// Deleting a missing key answers 200 with an error body.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response> {
    let result = state.coordinator.delete(&key).await;
    log_outcome("DELETE", &key, &result, StatusCode::OK);

    let response = match result? {
        Removal::Deleted => Json(MessageResponse::deleted(key)).into_response(),
        Removal::NotFound => {
            (StatusCode::OK, Json(ErrorResponse::new("Key not found"))).into_response()
        }
    };
    Ok(response)
}

/// Handler for GET /stats
///
/// Returns cache and connection pool statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.coordinator.cache_stats().await;
    Json(StatsResponse::new(cache, state.coordinator.pool_stats()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
