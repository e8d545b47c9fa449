//! Behavior-driven tests for the notification-driven file pipeline.
//!
//! Object storage and the queue are scripted in memory; statuses and candles
//! land in a real DuckDB warehouse.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use candles_core::{
    BatchIngestor, BoxFuture, ErrorKind, FileProcessor, NotificationConsumer, NotificationQueue,
    ObjectStore, ProcessingStatus, QueueMessage, RangeQuery, RangeQueryService, ServiceError,
    StatusTracker,
};
use candles_warehouse::{Warehouse, WarehouseConfig};
use tempfile::{tempdir, TempDir};
use tokio_util::sync::CancellationToken;

const VALID_CSV: &[u8] = b"UNIX,SYMBOL,OPEN,HIGH,LOW,CLOSE\n\
                           1610000000,BTC/USD,100,200,50,150\n\
                           1610000060,BTC/USD,101,201,51,151\n";

/// Serves a fixed set of objects and records how many downloads overlap.
#[derive(Default)]
struct ScriptedStore {
    objects: HashMap<String, Vec<u8>>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    downloads: AtomicUsize,
}

impl ScriptedStore {
    fn with_objects(objects: &[(&str, &[u8])]) -> Self {
        Self {
            objects: objects
                .iter()
                .map(|(key, bytes)| (key.to_string(), bytes.to_vec()))
                .collect(),
            ..Self::default()
        }
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

impl ObjectStore for ScriptedStore {
    fn download<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<u8>, ServiceError>> {
        Box::pin(async move {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let result = self
                .objects
                .get(key)
                .cloned()
                .ok_or_else(|| ServiceError::transport(format!("object {key} not found")));

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        })
    }

    fn presign_upload<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<String, ServiceError>> {
        Box::pin(async move { Ok(format!("https://uploads.test/{key}")) })
    }
}

/// Hands out one message per key on the first receive, then nothing.
#[derive(Default)]
struct ScriptedQueue {
    pending: Mutex<Vec<QueueMessage>>,
    acknowledged: Mutex<Vec<String>>,
}

impl ScriptedQueue {
    fn with_keys(keys: &[&str]) -> Self {
        let messages = keys
            .iter()
            .enumerate()
            .map(|(index, key)| {
                let records = vec![serde_json::json!({ "s3": { "object": { "key": key } } })];
                QueueMessage {
                    body: Some(serde_json::json!({ "Records": records }).to_string()),
                    receipt_handle: Some(format!("receipt-{index}")),
                }
            })
            .collect();
        Self {
            pending: Mutex::new(messages),
            ..Self::default()
        }
    }
}

impl NotificationQueue for ScriptedQueue {
    fn receive<'a>(&'a self) -> BoxFuture<'a, Result<Vec<QueueMessage>, ServiceError>> {
        Box::pin(async move { Ok(std::mem::take(&mut *self.pending.lock().expect("pending"))) })
    }

    fn delete<'a>(&'a self, receipt_handles: &'a [String]) -> BoxFuture<'a, Result<(), ServiceError>> {
        Box::pin(async move {
            self.acknowledged
                .lock()
                .expect("acknowledged")
                .extend_from_slice(receipt_handles);
            Ok(())
        })
    }
}

struct Pipeline {
    warehouse: Arc<Warehouse>,
    tracker: StatusTracker,
    _temp: TempDir,
}

impl Pipeline {
    fn new() -> Self {
        let temp = tempdir().expect("tempdir");
        let warehouse = Arc::new(
            Warehouse::open(WarehouseConfig {
                db_path: temp.path().join("warehouse.duckdb"),
                max_pool_size: 4,
            })
            .expect("warehouse open"),
        );
        let tracker = StatusTracker::new(warehouse.clone());
        Self {
            warehouse,
            tracker,
            _temp: temp,
        }
    }

    fn processor(&self, store: Arc<ScriptedStore>) -> FileProcessor {
        FileProcessor::new(
            store,
            BatchIngestor::new(self.warehouse.clone(), false),
            self.tracker.clone(),
        )
    }

    async fn candle_count(&self) -> usize {
        RangeQueryService::new(self.warehouse.clone(), 1_000)
            .query(RangeQuery {
                symbol: "BTC/USD".to_string(),
                start: 1,
                ..RangeQuery::default()
            })
            .await
            .expect("query")
            .records
            .len()
    }
}

// =============================================================================
// Dispatch: Independent File Lifecycles
// =============================================================================

#[tokio::test]
async fn when_one_file_fails_the_others_still_complete() {
    // Given: Three notified files, one of which cannot be downloaded
    let pipeline = Pipeline::new();
    let store = Arc::new(ScriptedStore::with_objects(&[
        ("first.csv", VALID_CSV),
        ("third.csv", VALID_CSV),
    ]));
    let processor = pipeline.processor(store);

    // When: All three are dispatched and joined
    let outcomes = processor
        .dispatch(vec![
            "first.csv".to_string(),
            "missing.csv".to_string(),
            "third.csv".to_string(),
        ])
        .await
        .join()
        .await;

    // Then: Each file reaches its own terminal status
    assert_eq!(outcomes.len(), 3);
    for key in ["first.csv", "third.csv"] {
        let entry = pipeline.tracker.get_status(key).await.expect("status");
        assert_eq!(entry.status, ProcessingStatus::Completed);
        assert_eq!(entry.error, None);
    }
    let failed = pipeline.tracker.get_status("missing.csv").await.expect("status");
    assert_eq!(failed.status, ProcessingStatus::Failed);
    assert_eq!(
        failed.error.as_deref(),
        Some("transport error: object missing.csv not found")
    );

    // And: Both good files were ingested
    assert_eq!(pipeline.candle_count().await, 4);
}

#[tokio::test]
async fn when_a_file_has_a_bad_header_its_error_is_recorded() {
    let pipeline = Pipeline::new();
    let store = Arc::new(ScriptedStore::with_objects(&[(
        "broken.csv",
        &b"UNIX,SYMBOL,OPEN\n1610000000,BTC/USD,100\n"[..],
    )]));

    let result = pipeline.processor(store).process_file("broken.csv").await;

    let error = result.expect_err("must fail");
    assert_eq!(error.kind(), ErrorKind::InvalidArgument);
    let entry = pipeline.tracker.get_status("broken.csv").await.expect("status");
    assert_eq!(entry.status, ProcessingStatus::Failed);
    assert_eq!(
        entry.error.as_deref(),
        Some("invalid csv header, missing HIGH, LOW, CLOSE")
    );
}

#[tokio::test]
async fn when_a_file_is_dispatched_it_is_in_progress_before_its_pipeline_ends() {
    // Given: A download slow enough to observe the intermediate status
    let pipeline = Pipeline::new();
    let store = Arc::new(ScriptedStore {
        delay: Duration::from_millis(200),
        ..ScriptedStore::with_objects(&[("slow.csv", VALID_CSV)])
    });

    // When: The file is dispatched
    let handle = pipeline
        .processor(store)
        .dispatch(vec!["slow.csv".to_string()])
        .await;

    // Then: The status is in_progress as soon as dispatch returns
    let entry = pipeline.tracker.get_status("slow.csv").await.expect("status");
    assert_eq!(entry.status, ProcessingStatus::InProgress);

    handle.join().await;
    let entry = pipeline.tracker.get_status("slow.csv").await.expect("status");
    assert_eq!(entry.status, ProcessingStatus::Completed);
}

// =============================================================================
// Dispatch: Bounded Concurrency
// =============================================================================

#[tokio::test]
async fn when_concurrency_is_capped_downloads_never_exceed_the_cap() {
    // Given: Six slow files and a processor capped at two pipelines
    let pipeline = Pipeline::new();
    let keys: Vec<String> = (0..6).map(|index| format!("file-{index}.csv")).collect();
    let objects: Vec<(&str, &[u8])> = keys.iter().map(|key| (key.as_str(), VALID_CSV)).collect();
    let store = Arc::new(ScriptedStore {
        delay: Duration::from_millis(50),
        ..ScriptedStore::with_objects(&objects)
    });
    let processor = pipeline.processor(store.clone()).with_max_concurrency(2);

    // When: All six are dispatched at once
    let outcomes = processor.dispatch(keys.clone()).await.join().await;

    // Then: Everything completes while at most two downloads overlapped
    assert!(outcomes.iter().all(|outcome| outcome.result.is_ok()));
    assert_eq!(store.downloads(), 6);
    assert!(store.peak() <= 2, "peak concurrency was {}", store.peak());
    for key in &keys {
        let entry = pipeline.tracker.get_status(key).await.expect("status");
        assert_eq!(entry.status, ProcessingStatus::Completed);
    }
}

// =============================================================================
// Shutdown: Cancellation
// =============================================================================

#[tokio::test]
async fn when_processor_is_shut_down_queued_files_fail_without_downloading() {
    // Given: A processor whose shutdown token has already fired
    let pipeline = Pipeline::new();
    let store = Arc::new(ScriptedStore::with_objects(&[("late.csv", VALID_CSV)]));
    let shutdown = CancellationToken::new();
    let processor = pipeline
        .processor(store.clone())
        .with_max_concurrency(1)
        .with_cancellation(shutdown.clone());
    shutdown.cancel();

    // When: A file is dispatched
    let outcomes = processor
        .dispatch(vec!["late.csv".to_string()])
        .await
        .join()
        .await;

    // Then: The pipeline stops before touching storage
    assert!(matches!(outcomes[0].result, Err(ServiceError::Cancelled)));
    assert_eq!(store.downloads(), 0);
    let entry = pipeline.tracker.get_status("late.csv").await.expect("status");
    assert_eq!(entry.status, ProcessingStatus::Failed);
    assert_eq!(entry.error.as_deref(), Some("processing cancelled"));
    assert_eq!(pipeline.candle_count().await, 0);
}

#[tokio::test]
async fn when_shutdown_fires_mid_dispatch_running_and_waiting_files_stop() {
    // Given: Three slow files behind a single-pipeline cap and a shared token
    let pipeline = Pipeline::new();
    let store = Arc::new(ScriptedStore {
        delay: Duration::from_millis(200),
        ..ScriptedStore::with_objects(&[
            ("one.csv", VALID_CSV),
            ("two.csv", VALID_CSV),
            ("three.csv", VALID_CSV),
        ])
    });
    let shutdown = CancellationToken::new();
    let processor = pipeline
        .processor(store.clone())
        .with_max_concurrency(1)
        .with_cancellation(shutdown.clone());

    // When: The token fires while the first download is still running
    let handle = processor
        .dispatch(vec![
            "one.csv".to_string(),
            "two.csv".to_string(),
            "three.csv".to_string(),
        ])
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.cancel();
    let outcomes = handle.join().await;

    // Then: Only the first file was downloaded and none were ingested
    assert_eq!(store.downloads(), 1);
    assert!(outcomes
        .iter()
        .all(|outcome| matches!(outcome.result, Err(ServiceError::Cancelled))));
    for key in ["one.csv", "two.csv", "three.csv"] {
        let entry = pipeline.tracker.get_status(key).await.expect("status");
        assert_eq!(entry.status, ProcessingStatus::Failed);
        assert_eq!(entry.error.as_deref(), Some("processing cancelled"));
    }
    assert_eq!(pipeline.candle_count().await, 0);
}

// =============================================================================
// Polling: Queue To Warehouse
// =============================================================================

#[tokio::test]
async fn when_the_queue_notifies_files_they_are_processed_and_acknowledged() {
    // Given: Two queue messages announcing two files
    let pipeline = Pipeline::new();
    let store = Arc::new(ScriptedStore::with_objects(&[
        ("upload-a.csv", VALID_CSV),
        ("upload-b.csv", VALID_CSV),
    ]));
    let queue = Arc::new(ScriptedQueue::with_keys(&["upload-a.csv", "upload-b.csv"]));
    let consumer = NotificationConsumer::new(queue.clone());
    let processor = pipeline.processor(store);

    // When: One poll cycle runs to completion
    let handle = processor.poll_and_dispatch(&consumer).await.expect("poll");
    assert_eq!(
        handle.keys().collect::<Vec<_>>(),
        vec!["upload-a.csv", "upload-b.csv"]
    );
    handle.join().await;

    // Then: Both messages are acknowledged and both files completed
    assert_eq!(
        *queue.acknowledged.lock().expect("acknowledged"),
        vec!["receipt-0", "receipt-1"]
    );
    for key in ["upload-a.csv", "upload-b.csv"] {
        let entry = pipeline.tracker.get_status(key).await.expect("status");
        assert_eq!(entry.status, ProcessingStatus::Completed);
    }
    assert_eq!(pipeline.candle_count().await, 4);

    // And: The next poll finds nothing to do
    let idle = processor.poll_and_dispatch(&consumer).await.expect("poll");
    assert!(idle.is_empty());
}
