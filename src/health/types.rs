//! Health data model.
//!
//! All values here are immutable once produced. A newer probe or aggregation
//! supersedes an older one wholesale; nothing is patched in place.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a resource check or of an aggregated snapshot.
///
/// Variants are declared in severity order, so `Ord` gives the
/// worst-of-all-checks rule directly: `Unhealthy > Degraded > Healthy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }

    /// Numeric form used for gauges.
    pub fn as_gauge(self) -> f64 {
        match self {
            HealthStatus::Healthy => 0.0,
            HealthStatus::Degraded => 1.0,
            HealthStatus::Unhealthy => 2.0,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single dependency probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyStatus {
    Up,
    Down,
    Degraded,
}

impl DependencyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DependencyStatus::Up => "up",
            DependencyStatus::Down => "down",
            DependencyStatus::Degraded => "degraded",
        }
    }

    /// Contribution of this dependency to the overall status.
    pub fn severity(self) -> HealthStatus {
        match self {
            DependencyStatus::Up => HealthStatus::Healthy,
            DependencyStatus::Degraded => HealthStatus::Degraded,
            DependencyStatus::Down => HealthStatus::Unhealthy,
        }
    }
}

/// Why a dependency probe did not come back `up`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Timeout,
    ConnectionRefused,
    ServerError,
    NotFound,
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::Timeout => "TIMEOUT",
            ErrorCategory::ConnectionRefused => "CONNECTION_REFUSED",
            ErrorCategory::ServerError => "SERVER_ERROR",
            ErrorCategory::NotFound => "NOT_FOUND",
            ErrorCategory::Unknown => "UNKNOWN",
        }
    }
}

/// Which local threshold a resource check crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceFailure {
    MemoryThreshold,
    RecordCountThreshold,
}

/// Result of probing one external dependency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyHealth {
    pub name: String,
    pub status: DependencyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_millis: Option<u64>,
    pub last_checked_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_category: Option<ErrorCategory>,
}

/// Result of one local resource threshold check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceHealth {
    pub name: String,
    pub status: HealthStatus,
    pub current_value: f64,
    pub limit: f64,
    pub percentage_used: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_category: Option<ResourceFailure>,
}

/// The three public health views, each cached independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    Liveness,
    Readiness,
    Full,
}

impl CheckKind {
    pub const ALL: [CheckKind; 3] = [CheckKind::Liveness, CheckKind::Readiness, CheckKind::Full];

    pub fn as_str(self) -> &'static str {
        match self {
            CheckKind::Liveness => "liveness",
            CheckKind::Readiness => "readiness",
            CheckKind::Full => "full",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            CheckKind::Liveness => 0,
            CheckKind::Readiness => 1,
            CheckKind::Full => 2,
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown check kind `{0}` (expected live, ready or full)")]
pub struct UnknownCheckKind(pub String);

impl FromStr for CheckKind {
    type Err = UnknownCheckKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "live" | "liveness" => Ok(CheckKind::Liveness),
            "ready" | "readiness" => Ok(CheckKind::Readiness),
            "full" | "health" => Ok(CheckKind::Full),
            _ => Err(UnknownCheckKind(s.to_string())),
        }
    }
}

/// One aggregated health view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    pub overall_status: HealthStatus,
    pub service_name: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
    pub dependencies: Vec<DependencyHealth>,
    pub resources: Vec<ResourceHealth>,
    pub aggregation_duration_millis: u64,
    /// Free-form reason, set when liveness reports an unrecoverable process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Worst status across every dependency and resource check.
///
/// Empty input is healthy. The result depends only on the multiset of
/// statuses, never on their order.
pub fn derive_overall_status(
    dependencies: &[DependencyHealth],
    resources: &[ResourceHealth],
) -> HealthStatus {
    dependencies
        .iter()
        .map(|d| d.status.severity())
        .chain(resources.iter().map(|r| r.status))
        .max()
        .unwrap_or(HealthStatus::Healthy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dep(name: &str, status: DependencyStatus) -> DependencyHealth {
        DependencyHealth {
            name: name.to_string(),
            status,
            response_time_millis: Some(12),
            last_checked_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            error_category: None,
        }
    }

    fn res(name: &str, status: HealthStatus) -> ResourceHealth {
        ResourceHealth {
            name: name.to_string(),
            status,
            current_value: 50.0,
            limit: 100.0,
            percentage_used: 50.0,
            unit: "records".to_string(),
            error_category: None,
        }
    }

    #[test]
    fn test_empty_checks_are_healthy() {
        assert_eq!(derive_overall_status(&[], &[]), HealthStatus::Healthy);
    }

    #[test]
    fn test_worst_status_wins() {
        let deps = vec![dep("a", DependencyStatus::Up), dep("b", DependencyStatus::Degraded)];
        let resources = vec![res("memory", HealthStatus::Healthy)];
        assert_eq!(derive_overall_status(&deps, &resources), HealthStatus::Degraded);

        let resources = vec![res("memory", HealthStatus::Unhealthy)];
        assert_eq!(derive_overall_status(&deps, &resources), HealthStatus::Unhealthy);

        let deps = vec![dep("a", DependencyStatus::Down)];
        assert_eq!(derive_overall_status(&deps, &[]), HealthStatus::Unhealthy);
    }

    #[test]
    fn test_status_derivation_ignores_order() {
        let deps = vec![
            dep("a", DependencyStatus::Up),
            dep("b", DependencyStatus::Degraded),
            dep("c", DependencyStatus::Down),
        ];
        let resources = vec![
            res("memory", HealthStatus::Degraded),
            res("carts", HealthStatus::Healthy),
        ];
        let expected = derive_overall_status(&deps, &resources);

        // Every rotation and reversal of both lists.
        for shift in 0..deps.len() {
            let mut d = deps.clone();
            d.rotate_left(shift);
            for reverse in [false, true] {
                let mut r = resources.clone();
                if reverse {
                    r.reverse();
                    d.reverse();
                }
                assert_eq!(derive_overall_status(&d, &r), expected);
            }
        }
    }

    #[test]
    fn test_check_kind_parsing() {
        assert_eq!("live".parse::<CheckKind>(), Ok(CheckKind::Liveness));
        assert_eq!("READY".parse::<CheckKind>(), Ok(CheckKind::Readiness));
        assert_eq!("full".parse::<CheckKind>(), Ok(CheckKind::Full));
        assert!("startup".parse::<CheckKind>().is_err());
    }

    #[test]
    fn test_snapshot_wire_format() {
        let mut down = dep("catalog", DependencyStatus::Down);
        down.response_time_millis = None;
        down.error_category = Some(ErrorCategory::Timeout);

        let mut memory = res("memory", HealthStatus::Degraded);
        memory.error_category = Some(ResourceFailure::MemoryThreshold);

        let snapshot = HealthSnapshot {
            overall_status: HealthStatus::Unhealthy,
            service_name: "cart-service".to_string(),
            version: "1.2.3".to_string(),
            uptime_seconds: 42,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 5).unwrap(),
            dependencies: vec![down, dep("orders", DependencyStatus::Up)],
            resources: vec![memory],
            aggregation_duration_millis: 2001,
            detail: None,
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["overallStatus"], "unhealthy");
        assert_eq!(json["dependencies"][0]["status"], "down");
        assert_eq!(json["dependencies"][0]["errorCategory"], "TIMEOUT");
        assert!(json["dependencies"][0].get("responseTimeMillis").is_none());
        assert_eq!(json["resources"][0]["errorCategory"], "MEMORY_THRESHOLD");
        assert!(json.get("detail").is_none());

        let text = serde_json::to_string(&snapshot).unwrap();
        let parsed: HealthSnapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, snapshot);
    }
}
