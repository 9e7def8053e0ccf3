//! Pump and dispatch benchmark suite.
//!
//! Measures how fast one pump dispatches a batch of frames:
//! - Batch sizes: 10, 100, 1000
//! - Event batches (lifecycle tracker subscribed) and reply batches
//!
//! Run with: cargo bench --bench dispatch
//! Results saved to: target/criterion/

use std::sync::Arc;

use async_trait::async_trait;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use devtools_driver::{
    Connection, ConnectionOptions, FrameId, LoaderId, Message, Page, PageOptions, Result, Session,
    Transport,
};
use parking_lot::Mutex;
use serde_json::json;
use tokio::runtime::Runtime;

// ============================================================================
// Benchmark Parameters
// ============================================================================

const BATCH_SIZES: &[usize] = &[10, 100, 1000];

// ============================================================================
// Transport
// ============================================================================

/// Replays a prepared batch on every pump.
#[derive(Clone)]
struct ReplayTransport {
    batch: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Transport for ReplayTransport {
    async fn send(&mut self, _frame: String) -> Result<()> {
        Ok(())
    }

    async fn read_data(&mut self) -> Result<Vec<String>> {
        Ok(self.batch.lock().clone())
    }
}

fn lifecycle_batch(size: usize) -> Vec<String> {
    (0..size)
        .map(|i| {
            json!({
                "method": "Page.lifecycleEvent",
                "params": {
                    "frameId": "MAIN",
                    "loaderId": "L1",
                    "name": format!("milestone-{}", i % 8),
                    "timestamp": i as f64,
                }
            })
            .to_string()
        })
        .collect()
}

// ============================================================================
// Benchmark: Event Dispatch
// ============================================================================

fn bench_event_dispatch(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");

    let mut group = c.benchmark_group("event_dispatch");

    for &size in BATCH_SIZES {
        let transport = ReplayTransport {
            batch: Arc::new(Mutex::new(lifecycle_batch(size))),
        };
        let connection = Connection::new(transport, ConnectionOptions::new());
        let page = Page::from_parts(
            Session::new(connection),
            FrameId::new("MAIN"),
            LoaderId::new("L1"),
            PageOptions::new(),
        );

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("lifecycle", size), &size, |b, _| {
            b.to_async(&rt).iter(|| async {
                page.pump().await.expect("pump");
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Reply Correlation
// ============================================================================

fn bench_reply_correlation(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");

    let mut group = c.benchmark_group("reply_correlation");

    for &size in BATCH_SIZES {
        let batch = Arc::new(Mutex::new(Vec::new()));
        let connection = Connection::new(
            ReplayTransport {
                batch: Arc::clone(&batch),
            },
            ConnectionOptions::new().with_max_pending(size.max(1)),
        );

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("replies", size), &size, |b, &count| {
            b.to_async(&rt).iter(|| async {
                let mut readers = Vec::with_capacity(count);
                for _ in 0..count {
                    let reader = connection
                        .send_deferred(&Message::new("Runtime.evaluate"))
                        .await
                        .expect("send");
                    readers.push(reader);
                }

                *batch.lock() = readers
                    .iter()
                    .map(|r| json!({"id": r.id(), "result": {}}).to_string())
                    .collect();

                connection.read_data().await.expect("pump");
                for mut reader in readers {
                    assert!(reader.poll().await.expect("poll").is_some());
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_event_dispatch, bench_reply_correlation);
criterion_main!(benches);
