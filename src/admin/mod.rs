//! Operational endpoints, bearer-token protected.
//!
//! - `GET /admin/status`: service identity, uptime, cache state
//! - `DELETE /admin/health/cache/{kind}`: force the next check to re-probe

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{delete, get},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/health/cache/{kind}", delete(invalidate_cache))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
