//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the aggregator from validated configuration
//! - Start the memory sampler
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The aggregator is built exactly once and shared by `Arc`

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::config::HealthConfig;
use crate::health::{
    CacheTtls, HealthAggregator, HealthError, HttpDependencyClient, MemoryGauge, ProcessMemory,
    RecordCounter, ResourceLimits,
};
use crate::http::HealthServer;
use crate::lifecycle::Shutdown;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to build health aggregator: {0}")]
    Health(#[from] HealthError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Build an aggregator probing every configured dependency over HTTP.
pub fn build_aggregator(
    config: &HealthConfig,
    records: Option<Arc<dyn RecordCounter>>,
    memory: Option<Arc<dyn MemoryGauge>>,
) -> Result<HealthAggregator, HealthError> {
    let mut builder = HealthAggregator::builder()
        .service_name(config.service.name.as_str())
        .version(config.service.version.as_str())
        .limits(ResourceLimits::from(&config.resources))
        .ttls(CacheTtls::from(&config.cache));

    for dep in &config.dependencies {
        let timeout = Duration::from_millis(config.probe_timeout_ms(dep));
        tracing::info!(
            dependency = %dep.name,
            url = %dep.url,
            timeout_ms = timeout.as_millis() as u64,
            "Registering dependency"
        );
        builder = builder.dependency(
            dep.name.as_str(),
            Arc::new(HttpDependencyClient::new(dep.url.as_str())),
            timeout,
        );
    }

    if let Some(records) = records {
        builder = builder.records(records);
    }
    if let Some(memory) = memory {
        builder = builder.memory(memory);
    }

    builder.build()
}

/// Run the health service until `shutdown` fires.
pub async fn run(
    config: HealthConfig,
    records: Option<Arc<dyn RecordCounter>>,
    shutdown: Shutdown,
) -> Result<(), StartupError> {
    let memory = Arc::new(ProcessMemory::new());
    tokio::spawn(memory.clone().run(
        Duration::from_secs(config.resources.memory_sample_interval_secs),
        shutdown.subscribe(),
    ));

    let gauge: Arc<dyn MemoryGauge> = memory;
    let aggregator = Arc::new(build_aggregator(&config, records, Some(gauge))?);

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;

    HealthServer::new(config, aggregator)
        .run(listener, shutdown.subscribe())
        .await
        .map_err(StartupError::Serve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DependencyConfig;
    use crate::health::SharedRecordCount;

    #[test]
    fn test_build_aggregator_from_config() {
        let mut config = HealthConfig::default();
        config.service.name = "cart-service".to_string();
        config.dependencies = vec![
            DependencyConfig {
                name: "product-catalog".to_string(),
                url: "http://127.0.0.1:3001/health".to_string(),
                timeout_ms: None,
            },
            DependencyConfig {
                name: "orders".to_string(),
                url: "http://127.0.0.1:3003/health".to_string(),
                timeout_ms: Some(750),
            },
        ];

        let records: Arc<dyn RecordCounter> = Arc::new(SharedRecordCount::new(0));
        let agg = build_aggregator(&config, Some(records), None).unwrap();

        assert_eq!(agg.service_name(), "cart-service");
        let deps = agg.dependencies();
        assert_eq!(deps[0].name, "product-catalog");
        assert_eq!(deps[0].timeout, Duration::from_millis(2000));
        assert_eq!(deps[1].timeout, Duration::from_millis(750));
    }
}
