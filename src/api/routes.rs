//! API Routes
//!
//! Configures the Axum router with all key-value server endpoints.

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    create_handler, delete_handler, get_handler, health_handler, stats_handler, update_handler,
    AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /kv/:key` - Read a value
/// - `POST /kv/:key` - Create a key-value pair
/// - `PUT /kv/:key` - Update an existing key
/// - `DELETE /kv/:key` - Delete a key
/// - `GET /stats` - Cache and pool statistics
/// - `GET /health` - Health check endpoint
///
/// Any other method on `/kv/:key` gets 405 from the router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/kv/:key",
            get(get_handler)
                .post(create_handler)
                .put(update_handler)
                .delete(delete_handler),
        )
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
