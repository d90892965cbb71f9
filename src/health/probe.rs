//! Dependency probing.
//!
//! # Responsibilities
//! - Issue exactly one bounded-time call to a dependency
//! - Classify the outcome into `DependencyHealth`
//!
//! # Design Decisions
//! - The probe enforces its own hard deadline with `tokio::time::timeout`,
//!   whether or not the client honors the budget it is handed
//! - No retries; a timed-out call is dropped, not awaited
//! - Failures are data, never errors

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time::{self, Instant};

use crate::health::types::{DependencyHealth, DependencyStatus, ErrorCategory};
use crate::observability::metrics;

/// Successful answer from a dependency health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pong {
    /// Latency as measured by the client, if it measures one.
    pub latency: Option<Duration>,
}

/// Failure modes a client can report back to the probe.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PingError {
    #[error("connection refused: {0}")]
    ConnectionRefused(String),
    #[error("dependency answered with status {0}")]
    Status(u16),
    #[error("client-side timeout")]
    TimedOut,
    #[error("{0}")]
    Other(String),
}

/// A single outbound health call to one dependency.
///
/// This is the only hook the health subsystem has into another service.
#[async_trait]
pub trait DependencyClient: Send + Sync {
    async fn ping(&self, timeout: Duration) -> Result<Pong, PingError>;
}

/// HTTP `GET` against a dependency's health URL.
pub struct HttpDependencyClient {
    url: String,
    client: Client<HttpConnector, Body>,
}

impl HttpDependencyClient {
    pub fn new(url: impl Into<String>) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_nodelay(true);
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(connector);

        Self {
            url: url.into(),
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DependencyClient for HttpDependencyClient {
    async fn ping(&self, timeout: Duration) -> Result<Pong, PingError> {
        let request = Request::builder()
            .method("GET")
            .uri(self.url.as_str())
            .header("user-agent", "service-health-probe")
            .body(Body::empty())
            .map_err(|e| PingError::Other(format!("invalid health request: {}", e)))?;

        let started = Instant::now();
        match time::timeout(timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let status = response.status();
                if status.is_success() {
                    Ok(Pong {
                        latency: Some(started.elapsed()),
                    })
                } else {
                    Err(PingError::Status(status.as_u16()))
                }
            }
            Ok(Err(e)) if e.is_connect() => Err(PingError::ConnectionRefused(e.to_string())),
            Ok(Err(e)) => Err(PingError::Other(e.to_string())),
            Err(_) => Err(PingError::TimedOut),
        }
    }
}

/// Probe one dependency within `budget` and classify the outcome.
///
/// Never fails: timeouts, refused connections and error statuses all come
/// back as a `DependencyHealth` value.
pub async fn probe(name: &str, client: &dyn DependencyClient, budget: Duration) -> DependencyHealth {
    let started = Instant::now();
    let outcome = time::timeout(budget, client.ping(budget)).await;
    let elapsed = started.elapsed();

    let (status, category, response_time) = match outcome {
        Ok(Ok(pong)) => (DependencyStatus::Up, None, Some(pong.latency.unwrap_or(elapsed))),
        Ok(Err(e)) => {
            let (status, category, answered) = classify(&e);
            tracing::warn!(
                dependency = %name,
                category = category.as_str(),
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "Dependency probe failed"
            );
            (status, Some(category), answered.then_some(elapsed))
        }
        Err(_) => {
            tracing::warn!(
                dependency = %name,
                budget_ms = budget.as_millis() as u64,
                "Dependency probe timed out"
            );
            (DependencyStatus::Down, Some(ErrorCategory::Timeout), None)
        }
    };

    metrics::record_probe(name, status, category, elapsed);

    DependencyHealth {
        name: name.to_string(),
        status,
        response_time_millis: response_time.map(|d| d.as_millis() as u64),
        last_checked_at: Utc::now(),
        error_category: category,
    }
}

/// Map a client failure to (status, category, dependency-answered).
fn classify(error: &PingError) -> (DependencyStatus, ErrorCategory, bool) {
    match error {
        PingError::TimedOut => (DependencyStatus::Down, ErrorCategory::Timeout, false),
        PingError::ConnectionRefused(_) => {
            (DependencyStatus::Down, ErrorCategory::ConnectionRefused, false)
        }
        PingError::Status(code) => match StatusCode::from_u16(*code) {
            Ok(status) if status.is_server_error() => {
                (DependencyStatus::Down, ErrorCategory::ServerError, true)
            }
            Ok(StatusCode::NOT_FOUND) => (DependencyStatus::Down, ErrorCategory::NotFound, true),
            _ => (DependencyStatus::Degraded, ErrorCategory::Unknown, true),
        },
        PingError::Other(_) => (DependencyStatus::Down, ErrorCategory::Unknown, false),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted client: sleeps, counts calls, then returns a fixed outcome.
    pub(crate) struct ScriptedClient {
        pub delay: Duration,
        pub outcome: Result<Pong, PingError>,
        pub calls: AtomicUsize,
    }

    impl ScriptedClient {
        pub(crate) fn new(delay_ms: u64, outcome: Result<Pong, PingError>) -> Self {
            Self {
                delay: Duration::from_millis(delay_ms),
                outcome,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn up(delay_ms: u64) -> Self {
            Self::new(delay_ms, Ok(Pong { latency: None }))
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DependencyClient for ScriptedClient {
        async fn ping(&self, _timeout: Duration) -> Result<Pong, PingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            time::sleep(self.delay).await;
            self.outcome.clone()
        }
    }

    const BUDGET: Duration = Duration::from_millis(2000);

    #[tokio::test(start_paused = true)]
    async fn test_probe_up_records_response_time() {
        let client = ScriptedClient::up(120);
        let health = probe("catalog", &client, BUDGET).await;

        assert_eq!(health.status, DependencyStatus::Up);
        assert_eq!(health.error_category, None);
        assert_eq!(health.response_time_millis, Some(120));
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_timeout_is_bounded_by_budget() {
        let client = ScriptedClient::up(10_000);
        let started = Instant::now();
        let health = probe("catalog", &client, BUDGET).await;

        assert_eq!(health.status, DependencyStatus::Down);
        assert_eq!(health.error_category, Some(ErrorCategory::Timeout));
        assert_eq!(health.response_time_millis, None);
        assert_eq!(started.elapsed(), BUDGET);
        assert_eq!(client.calls(), 1, "probe must not retry");
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_classifies_failures() {
        let cases = [
            (
                PingError::ConnectionRefused("refused".into()),
                DependencyStatus::Down,
                ErrorCategory::ConnectionRefused,
            ),
            (PingError::Status(500), DependencyStatus::Down, ErrorCategory::ServerError),
            (PingError::Status(503), DependencyStatus::Down, ErrorCategory::ServerError),
            (PingError::Status(404), DependencyStatus::Down, ErrorCategory::NotFound),
            (PingError::Status(401), DependencyStatus::Degraded, ErrorCategory::Unknown),
            (PingError::Status(429), DependencyStatus::Degraded, ErrorCategory::Unknown),
            (PingError::TimedOut, DependencyStatus::Down, ErrorCategory::Timeout),
            (PingError::Other("dns".into()), DependencyStatus::Down, ErrorCategory::Unknown),
        ];

        for (error, status, category) in cases {
            let client = ScriptedClient::new(5, Err(error.clone()));
            let health = probe("orders", &client, BUDGET).await;
            assert_eq!(health.status, status, "status for {:?}", error);
            assert_eq!(health.error_category, Some(category), "category for {:?}", error);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_answered_failures_keep_response_time() {
        let client = ScriptedClient::new(30, Err(PingError::Status(500)));
        let health = probe("orders", &client, BUDGET).await;
        assert_eq!(health.response_time_millis, Some(30));

        let client = ScriptedClient::new(30, Err(PingError::ConnectionRefused("x".into())));
        let health = probe("orders", &client, BUDGET).await;
        assert_eq!(health.response_time_millis, None);
    }

    #[tokio::test]
    async fn test_http_client_reports_connection_refused() {
        // Bind then drop to get a port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpDependencyClient::new(format!("http://{}/health", addr));
        let health = probe("catalog", &client, BUDGET).await;
        assert_eq!(health.status, DependencyStatus::Down);
        assert_eq!(health.error_category, Some(ErrorCategory::ConnectionRefused));
    }
}
