//! Per-process health and readiness monitoring.
//!
//! Separates *liveness* (should this process be restarted?) from
//! *readiness* (should it receive traffic?), probes dependencies with
//! bounded timeouts, grades local resources against thresholds and caches
//! the aggregated result per check kind.

pub mod admin;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::HealthConfig;
pub use health::HealthAggregator;
pub use http::HealthServer;
pub use lifecycle::Shutdown;
