//! kv_server - An HTTP key-value store
//!
//! Serves `/kv/{key}` CRUD requests from an LRU cache kept coherent with a
//! SQL table reached through a fixed-size connection pool.

pub mod api;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod db;
pub mod error;
pub mod loadgen;
pub mod models;
pub mod pool;

#[cfg(test)]
mod test_support;

pub use api::AppState;
pub use config::Config;
pub use coordinator::Coordinator;
pub use db::KvDatabase;
