//! Local resource checks.
//!
//! # Responsibilities
//! - Compare process memory and the in-memory record count against limits
//! - Grade each into healthy / degraded / unhealthy
//!
//! # Design Decisions
//! - `sample()` does no I/O: memory is read from an atomic that a background
//!   ticker keeps current, record counts come from the owning service
//! - Three-tier thresholds: `>= hard` unhealthy, `>= soft` degraded

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::config::ResourcesConfig;
use crate::health::types::{HealthStatus, ResourceFailure, ResourceHealth};
use crate::observability::metrics;

/// Current process memory usage in bytes, if known.
pub trait MemoryGauge: Send + Sync {
    fn used_bytes(&self) -> Option<u64>;
}

/// Number of live in-memory business records (e.g. active carts).
pub trait RecordCounter: Send + Sync {
    fn active_record_count(&self) -> u64;
}

/// A record count the owning service updates as records come and go.
#[derive(Debug, Default)]
pub struct SharedRecordCount(AtomicU64);

impl SharedRecordCount {
    pub fn new(initial: u64) -> Self {
        Self(AtomicU64::new(initial))
    }

    pub fn set(&self, count: u64) {
        self.0.store(count, Ordering::Relaxed);
    }

    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| Some(n.saturating_sub(1)));
    }
}

impl RecordCounter for SharedRecordCount {
    fn active_record_count(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Resident set size of this process, refreshed by [`ProcessMemory::run`].
#[derive(Debug, Default)]
pub struct ProcessMemory {
    rss_bytes: AtomicU64,
    available: AtomicBool,
}

impl ProcessMemory {
    pub fn new() -> Self {
        let memory = Self::default();
        memory.refresh();
        memory
    }

    /// Re-read RSS from the OS.
    pub fn refresh(&self) {
        match read_rss_bytes() {
            Some(bytes) => {
                self.rss_bytes.store(bytes, Ordering::Relaxed);
                self.available.store(true, Ordering::Relaxed);
            }
            None => {
                if self.available.swap(false, Ordering::Relaxed) {
                    tracing::debug!("Process RSS no longer readable; memory check disabled");
                }
            }
        }
    }

    /// Keep the reading fresh until shutdown.
    pub async fn run(self: Arc<Self>, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = interval.as_secs(), "Memory sampler starting");

        let mut ticker = time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.refresh(),
                _ = shutdown.recv() => {
                    tracing::info!("Memory sampler received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

impl MemoryGauge for ProcessMemory {
    fn used_bytes(&self) -> Option<u64> {
        self.available
            .load(Ordering::Relaxed)
            .then(|| self.rss_bytes.load(Ordering::Relaxed))
    }
}

#[cfg(target_os = "linux")]
fn read_rss_bytes() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_vm_rss(&status)
}

#[cfg(not(target_os = "linux"))]
fn read_rss_bytes() -> Option<u64> {
    None
}

/// Extract `VmRSS` (reported in kB) from `/proc/<pid>/status` contents.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_vm_rss(status: &str) -> Option<u64> {
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb * 1024)
}

/// Thresholds for the resource checks.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceLimits {
    pub memory_limit_bytes: u64,
    pub memory_soft_pct: f64,
    pub memory_hard_pct: f64,
    pub record_name: String,
    pub max_records: u64,
    pub record_soft_pct: f64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self::from(&ResourcesConfig::default())
    }
}

impl From<&ResourcesConfig> for ResourceLimits {
    fn from(config: &ResourcesConfig) -> Self {
        Self {
            memory_limit_bytes: config.memory_limit_bytes,
            memory_soft_pct: config.memory_soft_pct,
            memory_hard_pct: config.memory_hard_pct,
            record_name: config.record_name.clone(),
            max_records: config.max_records,
            record_soft_pct: config.record_soft_pct,
        }
    }
}

/// Grades local resource counters against [`ResourceLimits`].
pub struct ResourceSampler {
    memory: Option<Arc<dyn MemoryGauge>>,
    records: Option<Arc<dyn RecordCounter>>,
    limits: ResourceLimits,
}

impl ResourceSampler {
    pub fn new(
        memory: Option<Arc<dyn MemoryGauge>>,
        records: Option<Arc<dyn RecordCounter>>,
        limits: ResourceLimits,
    ) -> Self {
        Self {
            memory,
            records,
            limits,
        }
    }

    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    /// Memory first, then records. A source that is absent or has no
    /// reading is left out.
    pub fn sample(&self) -> Vec<ResourceHealth> {
        let limits = &self.limits;
        let mut out = Vec::with_capacity(2);

        if let Some(used) = self.memory.as_ref().and_then(|m| m.used_bytes()) {
            out.push(assess(
                "memory",
                used as f64,
                limits.memory_limit_bytes as f64,
                limits.memory_soft_pct,
                limits.memory_hard_pct,
                "bytes",
                ResourceFailure::MemoryThreshold,
            ));
        }

        if let Some(records) = &self.records {
            out.push(assess(
                &limits.record_name,
                records.active_record_count() as f64,
                limits.max_records as f64,
                limits.record_soft_pct,
                100.0,
                "records",
                ResourceFailure::RecordCountThreshold,
            ));
        }

        for r in &out {
            metrics::record_resource(&r.name, r.percentage_used);
        }
        out
    }
}

/// Grade one counter. A non-positive limit is treated as exhausted.
pub fn assess(
    name: &str,
    current: f64,
    limit: f64,
    soft_pct: f64,
    hard_pct: f64,
    unit: &str,
    failure: ResourceFailure,
) -> ResourceHealth {
    // Graded at the two decimals that get reported.
    let percentage = if limit > 0.0 {
        (current * 100.0 / limit * 100.0).round() / 100.0
    } else {
        f64::INFINITY
    };

    let status = if percentage >= hard_pct {
        HealthStatus::Unhealthy
    } else if percentage >= soft_pct {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    };

    ResourceHealth {
        name: name.to_string(),
        status,
        current_value: current,
        limit,
        percentage_used: if percentage.is_finite() { percentage } else { 100.0 },
        unit: unit.to_string(),
        error_category: (status != HealthStatus::Healthy).then_some(failure),
    }
}
