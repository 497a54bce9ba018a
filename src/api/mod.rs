//! API Module
//!
//! HTTP handlers and routing for the key-value REST API.
//!
//! # Endpoints
//! - `GET /kv/:key` - Read a value, reporting whether it came from cache or database
//! - `POST /kv/:key` - Create a key-value pair
//! - `PUT /kv/:key` - Update an existing key
//! - `DELETE /kv/:key` - Delete a key
//! - `GET /stats` - Cache and pool statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
