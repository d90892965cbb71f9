//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the health endpoints
//! - Mount admin endpoints when enabled
//! - Wire up middleware (tracing, timeout, request ID)
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::setup_admin_router;
use crate::config::{HealthConfig, ReadinessConfig};
use crate::health::HealthAggregator;
use crate::http::handlers;
use crate::http::request::{make_request_span, propagate_request_id_layer, set_request_id_layer};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<HealthAggregator>,
    pub readiness: ReadinessConfig,
    pub admin_api_key: Arc<str>,
}

/// HTTP server exposing the health endpoints.
pub struct HealthServer {
    router: Router,
    config: HealthConfig,
}

impl HealthServer {
    /// Create a new server around an already-built aggregator.
    pub fn new(config: HealthConfig, aggregator: Arc<HealthAggregator>) -> Self {
        let state = AppState {
            aggregator,
            readiness: config.readiness,
            admin_api_key: Arc::from(config.admin.api_key.as_str()),
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &HealthConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/health/live", get(handlers::liveness))
            .route("/health/ready", get(handlers::readiness))
            .route("/health", get(handlers::full_health));

        if config.admin.enabled {
            router = router.merge(setup_admin_router(state.clone()));
        }

        router
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for embedding or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            service = %self.config.service.name,
            dependencies = self.config.dependencies.len(),
            admin = self.config.admin.enabled,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &HealthConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use crate::http::request::X_REQUEST_ID;
    use tower::ServiceExt;

    fn server(admin: bool) -> HealthServer {
        let mut config = HealthConfig::default();
        config.admin.enabled = admin;
        config.admin.api_key = "secret".to_string();
        let aggregator = HealthAggregator::builder()
            .service_name("cart-service")
            .build()
            .unwrap();
        HealthServer::new(config, Arc::new(aggregator))
    }

    fn get(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health_routes_answer() {
        let router = server(false).router();
        for path in ["/health/live", "/health/ready", "/health"] {
            let res = router.clone().oneshot(get(path)).await.unwrap();
            assert_eq!(res.status(), StatusCode::OK, "{}", path);
            assert!(res.headers().contains_key(X_REQUEST_ID));
        }
    }

    #[tokio::test]
    async fn test_admin_routes_absent_when_disabled() {
        let res = server(false).router().oneshot(get("/admin/status")).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_admin_invalidate_all() {
        let req = Request::builder()
            .method(Method::DELETE)
            .uri("/admin/health/cache/all")
            .header("authorization", "Bearer secret")
            .body(Body::empty())
            .unwrap();
        let res = server(true).router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_incoming_request_id_is_echoed() {
        let req = Request::builder()
            .uri("/health/live")
            .header(X_REQUEST_ID, "req-42")
            .body(Body::empty())
            .unwrap();
        let res = server(false).router().oneshot(req).await.unwrap();
        assert_eq!(res.headers()[X_REQUEST_ID], "req-42");
    }
}
