//! Health endpoint rendering.
//!
//! # Responsibilities
//! - Map a snapshot's overall status to an HTTP status code per check kind
//! - Render machinery failures with a body that cannot be mistaken for a
//!   snapshot
//!
//! # Design Decisions
//! - Liveness: 503 only when the process reports itself unrecoverable
//! - Readiness / full: healthy → 200, unhealthy → 503, degraded follows
//!   `readiness.degraded_is_ready`
//! - Every health response is `Cache-Control: no-store`; caching is ours

use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::config::ReadinessConfig;
use crate::health::{CheckKind, HealthError, HealthSnapshot, HealthStatus};

/// HTTP status for a snapshot of the given kind.
pub fn status_code(kind: CheckKind, status: HealthStatus, policy: ReadinessConfig) -> StatusCode {
    match (kind, status) {
        (_, HealthStatus::Healthy) => StatusCode::OK,
        (_, HealthStatus::Unhealthy) => StatusCode::SERVICE_UNAVAILABLE,
        (CheckKind::Liveness, HealthStatus::Degraded) => StatusCode::OK,
        (_, HealthStatus::Degraded) if policy.degraded_is_ready => StatusCode::OK,
        (_, HealthStatus::Degraded) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// A snapshot ready to be sent.
pub struct HealthResponse {
    pub kind: CheckKind,
    pub snapshot: Arc<HealthSnapshot>,
    pub policy: ReadinessConfig,
}

impl IntoResponse for HealthResponse {
    fn into_response(self) -> Response {
        let code = status_code(self.kind, self.snapshot.overall_status, self.policy);
        (
            code,
            [(header::CACHE_CONTROL, "no-store")],
            Json(self.snapshot.as_ref()),
        )
            .into_response()
    }
}

/// Body sent when the health machinery itself failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthErrorBody {
    pub error: String,
    pub kind: CheckKind,
    pub message: String,
}

pub const HEALTH_CHECK_FAILED: &str = "health_check_failed";

/// A [`HealthError`] on its way to the client.
pub struct HealthFailure {
    pub kind: CheckKind,
    pub error: HealthError,
}

impl IntoResponse for HealthFailure {
    fn into_response(self) -> Response {
        tracing::error!(kind = %self.kind, error = %self.error, "Health check machinery failed");
        let body = HealthErrorBody {
            error: HEALTH_CHECK_FAILED.to_string(),
            kind: self.kind,
            message: self.error.to_string(),
        };
        (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CACHE_CONTROL, "no-store")],
            Json(body),
        )
            .into_response()
    }
}

/// Render an aggregator result for `kind`.
pub fn render(
    kind: CheckKind,
    result: Result<Arc<HealthSnapshot>, HealthError>,
    policy: ReadinessConfig,
) -> Response {
    match result {
        Ok(snapshot) => HealthResponse {
            kind,
            snapshot,
            policy,
        }
        .into_response(),
        Err(error) => HealthFailure { kind, error }.into_response(),
    }
}
