//! Load testing for the readiness endpoint.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

mod common;

#[tokio::test]
async fn test_concurrent_readiness_probes_dependency_once() {
    // 1. Setup slow mock dependency that counts hits
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let backend = common::start_programmable_backend(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async {
            tokio::time::sleep(Duration::from_millis(150)).await;
            (200, "ok".into())
        }
    })
    .await;

    // 2. Start service
    let svc = common::start_service(common::test_config(vec![common::dependency("catalog", backend)])).await;

    // 3. Fire concurrent readiness requests
    let concurrency = 20;
    let requests_per_task = 25;
    let total_requests = concurrency * requests_per_task;

    let client = common::client();
    let start = Instant::now();

    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let url = svc.url("/health/ready");
        tasks.push(tokio::spawn(async move {
            let mut ok = 0usize;
            for _ in 0..requests_per_task {
                if let Ok(res) = client.get(&url).send().await {
                    if res.status().is_success() {
                        ok += 1;
                    }
                }
            }
            ok
        }));
    }

    let mut successes = 0;
    for task in tasks {
        successes += task.await.unwrap();
    }
    let elapsed = start.elapsed();

    println!("Readiness load: {} requests in {:?}", total_requests, elapsed);

    // 4. Every request answered, dependency probed once within the TTL
    assert_eq!(successes, total_requests);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
