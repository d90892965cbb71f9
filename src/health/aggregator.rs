//! Health aggregation.
//!
//! # Responsibilities
//! - Probe every configured dependency concurrently and sample resources
//! - Fold the results into one overall status (worst check wins)
//! - Serve the liveness, readiness and full views through [`HealthCache`]
//!
//! # Design Decisions
//! - Liveness never touches dependencies: a downstream outage must not get
//!   this process restarted
//! - Probes run as independent tasks; the pass takes as long as the slowest
//!   probe, and results keep the configured order
//! - Only internal faults (a probe or refresh task dying) surface as
//!   `HealthError`

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use tokio::time::Instant;

use crate::config::CacheConfig;
use crate::health::cache::HealthCache;
use crate::health::probe::{self, DependencyClient};
use crate::health::resources::{MemoryGauge, RecordCounter, ResourceLimits, ResourceSampler};
use crate::health::types::{
    derive_overall_status, CheckKind, DependencyHealth, HealthSnapshot, HealthStatus,
    ResourceHealth,
};
use crate::observability::metrics;

/// Internal failure of the health machinery itself.
///
/// Distinct from a dependency being down, which is reported as data.
#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("probe task for dependency `{dependency}` did not complete: {source}")]
    ProbeTask {
        dependency: String,
        #[source]
        source: tokio::task::JoinError,
    },

    #[error("health refresh task did not complete: {0}")]
    RefreshTask(#[from] tokio::task::JoinError),

    #[error("health aggregator is missing required configuration: {0}")]
    MissingConfiguration(&'static str),
}

/// One dependency to probe, with its own budget.
#[derive(Clone)]
pub struct DependencyTarget {
    pub name: String,
    pub client: Arc<dyn DependencyClient>,
    pub timeout: Duration,
}

impl std::fmt::Debug for DependencyTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyTarget")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// TTL per check kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub liveness: Duration,
    pub readiness: Duration,
    pub full: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

impl From<&CacheConfig> for CacheTtls {
    fn from(config: &CacheConfig) -> Self {
        Self {
            liveness: Duration::from_secs(config.liveness_ttl_secs),
            readiness: Duration::from_secs(config.readiness_ttl_secs),
            full: Duration::from_secs(config.full_ttl_secs),
        }
    }
}

/// Combines dependency probes and resource samples into health snapshots.
pub struct HealthAggregator {
    checks: Arc<Checks>,
    cache: HealthCache,
    ttls: CacheTtls,
}

/// Everything a refresh needs; shared with the refresh task.
struct Checks {
    service_name: String,
    version: String,
    started_at: Instant,
    dependencies: Vec<DependencyTarget>,
    sampler: ResourceSampler,
    unrecoverable: OnceLock<String>,
}

impl HealthAggregator {
    pub fn builder() -> HealthAggregatorBuilder {
        HealthAggregatorBuilder::default()
    }

    pub fn service_name(&self) -> &str {
        &self.checks.service_name
    }

    pub fn version(&self) -> &str {
        &self.checks.version
    }

    pub fn uptime(&self) -> Duration {
        self.checks.started_at.elapsed()
    }

    pub fn dependencies(&self) -> &[DependencyTarget] {
        &self.checks.dependencies
    }

    pub fn cache(&self) -> &HealthCache {
        &self.cache
    }

    /// Is the process alive? Never probes dependencies.
    pub async fn liveness(&self) -> Result<Arc<HealthSnapshot>, HealthError> {
        let snapshot = self.cached_liveness().await?;
        if snapshot.overall_status == HealthStatus::Healthy && self.is_unrecoverable() {
            // Stored by a refresh that read the flag before it was set.
            self.cache.invalidate(CheckKind::Liveness);
            return self.cached_liveness().await;
        }
        Ok(snapshot)
    }

    async fn cached_liveness(&self) -> Result<Arc<HealthSnapshot>, HealthError> {
        let checks = self.checks.clone();
        self.cache
            .get_or_refresh(CheckKind::Liveness, self.ttls.liveness, move || async move {
                Ok(checks.liveness())
            })
            .await
    }

    /// Should this process receive traffic?
    pub async fn readiness(&self) -> Result<Arc<HealthSnapshot>, HealthError> {
        let checks = self.checks.clone();
        self.cache
            .get_or_refresh(CheckKind::Readiness, self.ttls.readiness, move || {
                checks.collect(CheckKind::Readiness)
            })
            .await
    }

    /// Readiness plus per-check response times, for dashboards.
    pub async fn full_health(&self) -> Result<Arc<HealthSnapshot>, HealthError> {
        let checks = self.checks.clone();
        self.cache
            .get_or_refresh(CheckKind::Full, self.ttls.full, move || {
                checks.collect(CheckKind::Full)
            })
            .await
    }

    pub async fn check(&self, kind: CheckKind) -> Result<Arc<HealthSnapshot>, HealthError> {
        match kind {
            CheckKind::Liveness => self.liveness().await,
            CheckKind::Readiness => self.readiness().await,
            CheckKind::Full => self.full_health().await,
        }
    }

    /// Record that the process cannot recover; liveness turns unhealthy.
    ///
    /// Only the first reason is kept.
    pub fn mark_unrecoverable(&self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::error!(reason = %reason, "Process marked unrecoverable");
        let _ = self.checks.unrecoverable.set(reason);
        self.cache.invalidate(CheckKind::Liveness);
    }

    pub fn is_unrecoverable(&self) -> bool {
        self.checks.unrecoverable.get().is_some()
    }
}

impl Checks {
    fn liveness(&self) -> HealthSnapshot {
        let started = Instant::now();
        let (status, detail) = match self.unrecoverable.get() {
            Some(reason) => (HealthStatus::Unhealthy, Some(reason.clone())),
            None => (HealthStatus::Healthy, None),
        };
        let mut snapshot = self.snapshot(status, Vec::new(), Vec::new(), started);
        snapshot.detail = detail;
        metrics::record_overall_status(CheckKind::Liveness, status);
        snapshot
    }

    async fn collect(self: Arc<Self>, kind: CheckKind) -> Result<HealthSnapshot, HealthError> {
        let started = Instant::now();

        let mut dependencies = self.probe_all().await?;
        let resources = self.sampler.sample();

        if kind == CheckKind::Readiness {
            for dep in &mut dependencies {
                dep.response_time_millis = None;
            }
        }

        let status = derive_overall_status(&dependencies, &resources);
        metrics::record_overall_status(kind, status);

        if status != HealthStatus::Healthy {
            let failing: Vec<&str> = dependencies
                .iter()
                .filter(|d| d.error_category.is_some())
                .map(|d| d.name.as_str())
                .chain(
                    resources
                        .iter()
                        .filter(|r| r.status != HealthStatus::Healthy)
                        .map(|r| r.name.as_str()),
                )
                .collect();
            tracing::warn!(kind = %kind, status = %status, failing = ?failing, "Service not healthy");
        }

        Ok(self.snapshot(status, dependencies, resources, started))
    }

    async fn probe_all(&self) -> Result<Vec<DependencyHealth>, HealthError> {
        let handles: Vec<_> = self
            .dependencies
            .iter()
            .map(|target| {
                let name = target.name.clone();
                let client = target.client.clone();
                let budget = target.timeout;
                tokio::spawn(async move { probe::probe(&name, client.as_ref(), budget).await })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(&self.dependencies)
            .map(|(joined, target)| {
                joined.map_err(|source| HealthError::ProbeTask {
                    dependency: target.name.clone(),
                    source,
                })
            })
            .collect()
    }

    fn snapshot(
        &self,
        status: HealthStatus,
        dependencies: Vec<DependencyHealth>,
        resources: Vec<ResourceHealth>,
        started: Instant,
    ) -> HealthSnapshot {
        HealthSnapshot {
            overall_status: status,
            service_name: self.service_name.clone(),
            version: self.version.clone(),
            uptime_seconds: self.started_at.elapsed().as_secs(),
            timestamp: Utc::now(),
            dependencies,
            resources,
            aggregation_duration_millis: started.elapsed().as_millis() as u64,
            detail: None,
        }
    }
}

/// Builder for [`HealthAggregator`].
#[derive(Default)]
pub struct HealthAggregatorBuilder {
    service_name: Option<String>,
    version: Option<String>,
    dependencies: Vec<DependencyTarget>,
    memory: Option<Arc<dyn MemoryGauge>>,
    records: Option<Arc<dyn RecordCounter>>,
    limits: Option<ResourceLimits>,
    ttls: Option<CacheTtls>,
}

impl HealthAggregatorBuilder {
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Dependencies are reported in the order they are added.
    pub fn dependency(
        mut self,
        name: impl Into<String>,
        client: Arc<dyn DependencyClient>,
        timeout: Duration,
    ) -> Self {
        self.dependencies.push(DependencyTarget {
            name: name.into(),
            client,
            timeout,
        });
        self
    }

    pub fn memory(mut self, gauge: Arc<dyn MemoryGauge>) -> Self {
        self.memory = Some(gauge);
        self
    }

    pub fn records(mut self, counter: Arc<dyn RecordCounter>) -> Self {
        self.records = Some(counter);
        self
    }

    pub fn limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    pub fn ttls(mut self, ttls: CacheTtls) -> Self {
        self.ttls = Some(ttls);
        self
    }

    pub fn build(self) -> Result<HealthAggregator, HealthError> {
        let service_name = self
            .service_name
            .filter(|n| !n.is_empty())
            .ok_or(HealthError::MissingConfiguration("service name"))?;
        if self.dependencies.iter().any(|d| d.timeout.is_zero()) {
            return Err(HealthError::MissingConfiguration("dependency probe timeout"));
        }

        Ok(HealthAggregator {
            checks: Arc::new(Checks {
                service_name,
                version: self
                    .version
                    .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
                started_at: Instant::now(),
                dependencies: self.dependencies,
                sampler: ResourceSampler::new(
                    self.memory,
                    self.records,
                    self.limits.unwrap_or_default(),
                ),
                unrecoverable: OnceLock::new(),
            }),
            cache: HealthCache::new(),
            ttls: self.ttls.unwrap_or_default(),
        })
    }
}
