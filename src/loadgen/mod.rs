//! Load Generator
//!
//! Drives a running server with concurrent HTTP clients for a fixed time
//! and reports throughput, latency and cache hit rate.
//!
//! # Workloads
//! - `put-all` - POST unique keys per client
//! - `get-all` - GET from the pre-populated `key_0..key_19999` range
//! - `get-popular` - GET a small set of hot keys
//! - `get-put` - 60% GET, 15% POST, 15% PUT, 10% DELETE

mod report;

pub use report::{is_cache_hit, is_success, LoadCounters, LoadReport};

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::ValueEnum;
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::{header::CONTENT_TYPE, Client, Method};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Keys `key_0..key_{N-1}` expected to exist for `get-all`.
pub const GET_ALL_PREPOP_COUNT: u64 = 20_000;
/// Length of generated values.
pub const VALUE_LENGTH: usize = 32;
/// Per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("invalid load configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Request mix a client runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Workload {
    /// POST unique keys
    PutAll,
    /// GET pre-populated keys
    GetAll,
    /// GET popular keys
    GetPopular,
    /// Mixed GET/POST/PUT/DELETE
    GetPut,
}

#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Base URL, e.g. `http://127.0.0.1:8080`
    pub server: String,
    pub clients: usize,
    pub duration: Duration,
    pub workload: Workload,
    /// Inclusive key range for `put-all` and `get-put`
    pub key_start: u64,
    pub key_end: u64,
    pub popular_keys: u64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            server: "http://127.0.0.1:8080".to_string(),
            clients: 1,
            duration: Duration::from_secs(10),
            workload: Workload::GetPut,
            key_start: 0,
            key_end: 2_000_000,
            popular_keys: 100,
        }
    }
}

impl LoadConfig {
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.clients == 0 {
            return Err(LoadError::InvalidConfig("clients must be positive".into()));
        }
        if self.key_start > self.key_end {
            return Err(LoadError::InvalidConfig(format!(
                "key range {}..={} is empty",
                self.key_start, self.key_end
            )));
        }
        if self.workload == Workload::GetPopular && self.popular_keys == 0 {
            return Err(LoadError::InvalidConfig(
                "popular-keys must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// One planned request.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub method: Method,
    pub key: String,
    /// JSON body for POST and PUT
    pub body: Option<String>,
}

impl Operation {
    fn get(key: String) -> Self {
        Self {
            method: Method::GET,
            key,
            body: None,
        }
    }

    fn write<R: Rng>(method: Method, key: String, rng: &mut R) -> Self {
        let body = serde_json::json!({ "key": key, "value": random_value(rng) }).to_string();
        Self {
            method,
            key,
            body: Some(body),
        }
    }

    pub fn path(&self) -> String {
        format!("/kv/{}", self.key)
    }
}

fn random_value<R: Rng>(rng: &mut R) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(VALUE_LENGTH)
        .map(char::from)
        .collect()
}

/// Chooses the next request for `client_id` under `config.workload`.
pub fn plan_operation<R: Rng>(config: &LoadConfig, client_id: usize, rng: &mut R) -> Operation {
    let range = config.key_start..=config.key_end;
    match config.workload {
        Workload::PutAll => {
            let key = format!(
                "{}_key_t{}_{}",
                config.clients,
                client_id,
                rng.gen_range(range)
            );
            Operation::write(Method::POST, key, rng)
        }
        Workload::GetAll => {
            Operation::get(format!("key_{}", rng.gen_range(0..GET_ALL_PREPOP_COUNT)))
        }
        Workload::GetPopular => {
            let index = rng.gen_range(0..config.popular_keys.max(1));
            Operation::get(format!("popular_key_{}", index))
        }
        Workload::GetPut => {
            let roll = rng.gen_range(0..100u8);
            let key = format!("key_{}", rng.gen_range(range));
            match roll {
                0..=59 => Operation::get(key),
                60..=74 => Operation::write(Method::POST, key, rng),
                75..=89 => Operation::write(Method::PUT, key, rng),
                _ => Operation {
                    method: Method::DELETE,
                    key,
                    body: None,
                },
            }
        }
    }
}

/// Runs the load test to completion.
pub async fn run(config: LoadConfig) -> Result<LoadReport, LoadError> {
    config.validate()?;

    let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
    let counters = Arc::new(LoadCounters::new());
    let config = Arc::new(config);

    info!(
        clients = config.clients,
        workload = ?config.workload,
        duration_secs = config.duration.as_secs_f64(),
        "starting load test"
    );

    let started = Instant::now();
    let deadline = started + config.duration;

    let handles: Vec<_> = (0..config.clients)
        .map(|client_id| {
            let client = client.clone();
            let counters = Arc::clone(&counters);
            let config = Arc::clone(&config);
            tokio::spawn(async move {
                client_loop(client, &config, client_id, deadline, &counters).await;
            })
        })
        .collect();

    for handle in handles {
        if let Err(e) = handle.await {
            warn!("client task failed: {}", e);
        }
    }

    Ok(counters.report(config.clients, started.elapsed()))
}

async fn client_loop(
    client: Client,
    config: &LoadConfig,
    client_id: usize,
    deadline: Instant,
    counters: &LoadCounters,
) {
    let mut rng = StdRng::from_entropy();
    let base = config.server.trim_end_matches('/');

    while Instant::now() < deadline {
        let op = plan_operation(config, client_id, &mut rng);
        let mut request = client.request(op.method.clone(), format!("{}{}", base, op.path()));
        if let Some(body) = op.body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        let sent = Instant::now();
        match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                counters.record_response(&op.method, status, &body, sent.elapsed());
            }
            Err(e) => {
                debug!(client_id, key = %op.key, "request failed: {}", e);
                counters.record_transport_failure();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(workload: Workload) -> LoadConfig {
        LoadConfig {
            workload,
            clients: 4,
            key_start: 10,
            key_end: 20,
            popular_keys: 5,
            ..LoadConfig::default()
        }
    }

    fn key_number(key: &str, prefix: &str) -> u64 {
        key.strip_prefix(prefix).unwrap().parse().unwrap()
    }

    #[test]
    fn test_validate() {
        assert!(config(Workload::GetPut).validate().is_ok());

        let zero_clients = LoadConfig {
            clients: 0,
            ..config(Workload::GetPut)
        };
        assert!(zero_clients.validate().is_err());

        let reversed = LoadConfig {
            key_start: 30,
            ..config(Workload::GetPut)
        };
        assert!(reversed.validate().is_err());

        let no_popular = LoadConfig {
            popular_keys: 0,
            ..config(Workload::GetPopular)
        };
        assert!(no_popular.validate().is_err());
    }

    #[test]
    fn test_put_all_keys() {
        let config = config(Workload::PutAll);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..100 {
            let op = plan_operation(&config, 2, &mut rng);
            assert_eq!(op.method, Method::POST);
            let n = key_number(&op.key, "4_key_t2_");
            assert!((10..=20).contains(&n));

            let body: serde_json::Value = serde_json::from_str(op.body.as_deref().unwrap()).unwrap();
            assert_eq!(body["key"], op.key.as_str());
            assert_eq!(body["value"].as_str().unwrap().len(), VALUE_LENGTH);
        }
    }

    #[test]
    fn test_get_all_keys() {
        let config = config(Workload::GetAll);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..100 {
            let op = plan_operation(&config, 0, &mut rng);
            assert_eq!(op.method, Method::GET);
            assert!(op.body.is_none());
            assert!(key_number(&op.key, "key_") < GET_ALL_PREPOP_COUNT);
        }
    }

    #[test]
    fn test_get_popular_keys() {
        let config = config(Workload::GetPopular);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..100 {
            let op = plan_operation(&config, 0, &mut rng);
            assert_eq!(op.method, Method::GET);
            assert!(key_number(&op.key, "popular_key_") < 5);
        }
    }

    #[test]
    fn test_get_put_mix() {
        let config = config(Workload::GetPut);
        let mut rng = StdRng::seed_from_u64(42);
        let (mut gets, mut posts, mut puts, mut deletes) = (0, 0, 0, 0);

        for _ in 0..10_000 {
            let op = plan_operation(&config, 0, &mut rng);
            assert!((10..=20).contains(&key_number(&op.key, "key_")));
            if op.method == Method::GET {
                gets += 1;
            } else if op.method == Method::POST {
                posts += 1;
            } else if op.method == Method::PUT {
                puts += 1;
            } else {
                assert_eq!(op.method, Method::DELETE);
                deletes += 1;
            }
            assert_eq!(op.body.is_some(), op.method == Method::POST || op.method == Method::PUT);
        }

        assert!((5_500..6_500).contains(&gets));
        assert!((1_200..1_800).contains(&posts));
        assert!((1_200..1_800).contains(&puts));
        assert!((700..1_300).contains(&deletes));
    }

    #[test]
    fn test_operation_path() {
        let op = Operation::get("key_1".to_string());
        assert_eq!(op.path(), "/kv/key_1");
    }

    #[tokio::test]
    async fn test_run_rejects_invalid_config() {
        let result = run(LoadConfig {
            clients: 0,
            ..LoadConfig::default()
        })
        .await;
        assert!(matches!(result, Err(LoadError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_run_counts_unreachable_server_as_failures() {
        let report = run(LoadConfig {
            server: "http://127.0.0.1:1".to_string(),
            clients: 2,
            duration: Duration::from_millis(100),
            ..LoadConfig::default()
        })
        .await
        .unwrap();

        assert_eq!(report.clients, 2);
        assert!(report.attempted > 0);
        assert_eq!(report.successful, 0);
        assert_eq!(report.failed, report.attempted);
    }
}
