//! Metrics collection and exposition.
//!
//! # Metrics
//! - `health_probe_total` (counter): probes by dependency, status, category
//! - `health_probe_duration_seconds` (histogram): probe latency per dependency
//! - `health_cache_lookups_total` (counter): cache hits/misses per kind
//! - `health_overall_status` (gauge): 0=healthy, 1=degraded, 2=unhealthy
//! - `health_resource_percent` (gauge): percentage used per resource
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op, so library users
//!   and tests pay nothing

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::health::types::{CheckKind, DependencyStatus, ErrorCategory, HealthStatus};

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_probe(
    dependency: &str,
    status: DependencyStatus,
    category: Option<ErrorCategory>,
    elapsed: Duration,
) {
    counter!(
        "health_probe_total",
        "dependency" => dependency.to_string(),
        "status" => status.as_str(),
        "category" => category.map(ErrorCategory::as_str).unwrap_or("NONE")
    )
    .increment(1);
    histogram!("health_probe_duration_seconds", "dependency" => dependency.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_cache_lookup(kind: CheckKind, hit: bool) {
    counter!(
        "health_cache_lookups_total",
        "kind" => kind.as_str(),
        "result" => if hit { "hit" } else { "miss" }
    )
    .increment(1);
}

pub fn record_overall_status(kind: CheckKind, status: HealthStatus) {
    gauge!("health_overall_status", "kind" => kind.as_str()).set(status.as_gauge());
}

pub fn record_resource(resource: &str, percentage_used: f64) {
    gauge!("health_resource_percent", "resource" => resource.to_string()).set(percentage_used);
}
