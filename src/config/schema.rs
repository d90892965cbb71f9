//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the health
//! service. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the health service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HealthConfig {
    /// Identity reported in every snapshot.
    pub service: ServiceConfig,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Functional request timeout.
    pub timeouts: TimeoutConfig,

    /// Default dependency probe budget.
    pub probe: ProbeConfig,

    /// Snapshot cache TTLs per check kind.
    pub cache: CacheConfig,

    /// HTTP status mapping for readiness.
    pub readiness: ReadinessConfig,

    /// Dependencies probed by readiness and full health, in report order.
    pub dependencies: Vec<DependencyConfig>,

    /// Local resource thresholds.
    pub resources: ResourcesConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Operational endpoints.
    pub admin: AdminConfig,
}

impl HealthConfig {
    /// Effective probe budget for a dependency.
    pub fn probe_timeout_ms(&self, dependency: &DependencyConfig) -> u64 {
        dependency.timeout_ms.unwrap_or(self.probe.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service name (e.g., "cart-service").
    pub name: String,

    /// Reported version; defaults to the crate version.
    pub version: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "service".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 5 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Hard budget for a single dependency probe, in milliseconds.
    /// Must be shorter than the request timeout.
    pub timeout_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self { timeout_ms: 2000 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub liveness_ttl_secs: u64,
    pub readiness_ttl_secs: u64,
    pub full_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            liveness_ttl_secs: 60,
            readiness_ttl_secs: 30,
            full_ttl_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Answer 200 (true) or 503 (false) when readiness is degraded.
    pub degraded_is_ready: bool,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            degraded_is_ready: true,
        }
    }
}

/// A dependency probed over HTTP.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DependencyConfig {
    /// Unique name, used in snapshots, logs and metrics.
    pub name: String,

    /// Absolute http:// URL of the dependency's health endpoint.
    pub url: String,

    /// Overrides `probe.timeout_ms` for this dependency.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResourcesConfig {
    /// Memory budget the RSS is compared against.
    pub memory_limit_bytes: u64,

    pub memory_soft_pct: f64,

    pub memory_hard_pct: f64,

    /// How often the background sampler re-reads RSS.
    pub memory_sample_interval_secs: u64,

    /// Name reported for the record-count check.
    pub record_name: String,

    /// Record count at which the service is unhealthy.
    pub max_records: u64,

    pub record_soft_pct: f64,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            memory_limit_bytes: 512 * 1024 * 1024,
            memory_soft_pct: 80.0,
            memory_hard_pct: 90.0,
            memory_sample_interval_secs: 5,
            record_name: "active_carts".to_string(),
            max_records: 10_000,
            record_soft_pct: 80.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin endpoints.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_API_KEY.to_string(),
        }
    }
}
