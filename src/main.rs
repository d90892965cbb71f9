//! Service health monitor.
//!
//! # Architecture Overview
//!
//! ```text
//!   Orchestrator / LB            ┌──────────────────────────────────────────────┐
//!   ───────────────────────────▶ │  http (axum)                                  │
//!   GET /health/live             │    │                                          │
//!   GET /health/ready            │    ▼                                          │
//!   GET /health                  │  HealthAggregator ──▶ HealthCache (per kind)  │
//!                                │    │                         │                │
//!                                │    ├──▶ probe ×N (concurrent, bounded) ──────┼──▶ dependencies
//!                                │    └──▶ ResourceSampler (memory, records)     │
//!                                └──────────────────────────────────────────────┘
//! ```
//!
//! Point restart checks at `/health/live` and traffic admission at
//! `/health/ready`.

use std::path::PathBuf;

use clap::Parser;

use service_health::config::{load_config, HealthConfig};
use service_health::lifecycle::{signals, startup, Shutdown};
use service_health::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "service-health")]
#[command(about = "Liveness and readiness monitor for a service and its dependencies", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => HealthConfig::default(),
    };

    logging::init_logging(&config.observability);

    tracing::info!(
        service = %config.service.name,
        version = %config.service.version,
        bind_address = %config.listener.bind_address,
        dependencies = config.dependencies.len(),
        probe_timeout_ms = config.probe.timeout_ms,
        readiness_ttl_secs = config.cache.readiness_ttl_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    // Standalone mode has no in-process record source; embedders pass one.
    startup::run(config, None, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
