//! Load generator for kv_server.
//!
//! ```bash
//! kv_loadgen --clients 16 --duration 30 --workload get-popular --popular-keys 50
//! ```

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kv_server::loadgen::{self, LoadConfig, Workload};

#[derive(Parser, Debug)]
#[command(name = "kv_loadgen", about = "Drive a kv_server with concurrent clients")]
struct Args {
    /// Concurrent client tasks
    #[arg(long, default_value_t = 1)]
    clients: usize,

    /// Test duration in seconds
    #[arg(long, default_value_t = 10)]
    duration: u64,

    /// Request mix
    #[arg(long, value_enum, default_value_t = Workload::GetPut)]
    workload: Workload,

    /// First key number for put-all and get-put
    #[arg(long, default_value_t = 0)]
    key_start: u64,

    /// Last key number (inclusive) for put-all and get-put
    #[arg(long, default_value_t = 2_000_000)]
    key_end: u64,

    /// Number of popular keys for get-popular
    #[arg(long, default_value_t = 100)]
    popular_keys: u64,

    /// Server base URL
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    server: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kv_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = LoadConfig {
        server: args.server,
        clients: args.clients,
        duration: Duration::from_secs(args.duration),
        workload: args.workload,
        key_start: args.key_start,
        key_end: args.key_end,
        popular_keys: args.popular_keys,
    };

    let report = loadgen::run(config).await?;
    println!("\n{}", report);
    Ok(())
}
