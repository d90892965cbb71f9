//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP adapter (crate::http)
//!     → aggregator.rs (liveness / readiness / full)
//!     → cache.rs (serve valid snapshot, or run one refresh per kind)
//!         → probe.rs (one bounded call per dependency, concurrently)
//!         → resources.rs (memory + record count vs thresholds)
//!     → types.rs (worst status wins)
//!     → HealthSnapshot back to the adapter
//! ```
//!
//! # Design Decisions
//! - Liveness and readiness are separate signals with separate caches
//! - Probe and sampler failures are data; only internal faults are errors
//! - The cache is owned by the aggregator, which is built once at startup
//!   and shared via `Arc`

pub mod aggregator;
pub mod cache;
pub mod probe;
pub mod resources;
pub mod types;

pub use aggregator::{CacheTtls, DependencyTarget, HealthAggregator, HealthError};
pub use cache::HealthCache;
pub use probe::{DependencyClient, HttpDependencyClient, PingError, Pong};
pub use resources::{
    MemoryGauge, ProcessMemory, RecordCounter, ResourceLimits, ResourceSampler, SharedRecordCount,
};
pub use types::{
    CheckKind, DependencyHealth, DependencyStatus, ErrorCategory, HealthSnapshot, HealthStatus,
    ResourceFailure, ResourceHealth,
};
