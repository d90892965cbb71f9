//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Probes, cache, aggregator produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID on every HTTP request (see crate::http::request)
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
