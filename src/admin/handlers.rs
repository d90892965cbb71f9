use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::health::CheckKind;
use crate::http::server::AppState;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindFlags {
    pub liveness: bool,
    pub readiness: bool,
    pub full: bool,
}

impl KindFlags {
    fn from_fn(f: impl Fn(CheckKind) -> bool) -> Self {
        Self {
            liveness: f(CheckKind::Liveness),
            readiness: f(CheckKind::Readiness),
            full: f(CheckKind::Full),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub service: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub unrecoverable: bool,
    pub dependencies: Vec<String>,
    /// Kinds with a refresh running right now.
    pub refreshing: KindFlags,
    /// Kinds with a snapshot that would be served without probing.
    pub cached: KindFlags,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let agg = &state.aggregator;
    let cache = agg.cache();

    Json(SystemStatus {
        service: agg.service_name().to_string(),
        version: agg.version().to_string(),
        uptime_seconds: agg.uptime().as_secs(),
        unrecoverable: agg.is_unrecoverable(),
        dependencies: agg.dependencies().iter().map(|d| d.name.clone()).collect(),
        refreshing: KindFlags::from_fn(|k| cache.is_refreshing(k)),
        cached: KindFlags::from_fn(|k| cache.peek(k).is_some()),
    })
}

/// `DELETE /admin/health/cache/{kind}` where kind is live, ready, full or all.
pub async fn invalidate_cache(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let cache = state.aggregator.cache();

    if kind.eq_ignore_ascii_case("all") {
        cache.invalidate_all();
    } else {
        let kind: CheckKind = kind
            .parse()
            .map_err(|e: crate::health::types::UnknownCheckKind| {
                (StatusCode::BAD_REQUEST, e.to_string())
            })?;
        cache.invalidate(kind);
    }

    Ok(StatusCode::NO_CONTENT)
}
