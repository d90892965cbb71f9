//! Shared utilities for integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use service_health::config::{DependencyConfig, HealthConfig};
use service_health::health::{HealthAggregator, RecordCounter, SharedRecordCount};
use service_health::lifecycle::startup::build_aggregator;
use service_health::{HealthServer, Shutdown};

pub const ADMIN_KEY: &str = "test-admin-key";

/// Start a programmable dependency on an ephemeral port.
///
/// `f` decides the status and body of every response.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                // Drain the request head before answering.
                let mut buf = [0u8; 1024];
                let mut head = Vec::new();
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }

                let (status, body) = f().await;
                let reason = StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Unknown");
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// A dependency config pointing at a mock backend.
pub fn dependency(name: &str, addr: SocketAddr) -> DependencyConfig {
    DependencyConfig {
        name: name.to_string(),
        url: format!("http://{}/health", addr),
        timeout_ms: None,
    }
}

/// Config for tests: admin on, short probe budget.
pub fn test_config(dependencies: Vec<DependencyConfig>) -> HealthConfig {
    let mut config = HealthConfig::default();
    config.service.name = "cart-service".to_string();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.probe.timeout_ms = 500;
    config.dependencies = dependencies;
    config.admin.enabled = true;
    config.admin.api_key = ADMIN_KEY.to_string();
    config
}

pub struct RunningService {
    pub addr: SocketAddr,
    pub aggregator: Arc<HealthAggregator>,
    pub records: Arc<SharedRecordCount>,
    pub shutdown: Shutdown,
}

impl RunningService {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for RunningService {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Serve `config` on an ephemeral port.
pub async fn start_service(config: HealthConfig) -> RunningService {
    let records = Arc::new(SharedRecordCount::new(0));
    let counter: Arc<dyn RecordCounter> = records.clone();
    let aggregator = Arc::new(build_aggregator(&config, Some(counter), None).unwrap());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HealthServer::new(config, aggregator.clone());
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    RunningService {
        addr,
        aggregator,
        records,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
