//! Health endpoint handlers.

use axum::extract::State;
use axum::response::Response;

use crate::health::CheckKind;
use crate::http::response::render;
use crate::http::server::AppState;

/// `GET /health/live`: restart decisions.
pub async fn liveness(State(state): State<AppState>) -> Response {
    render(CheckKind::Liveness, state.aggregator.liveness().await, state.readiness)
}

/// `GET /health/ready`: traffic admission.
pub async fn readiness(State(state): State<AppState>) -> Response {
    render(CheckKind::Readiness, state.aggregator.readiness().await, state.readiness)
}

/// `GET /health`: full report for humans and dashboards.
pub async fn full_health(State(state): State<AppState>) -> Response {
    render(CheckKind::Full, state.aggregator.full_health().await, state.readiness)
}
