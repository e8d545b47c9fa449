//! Asynchronous per-file processing of notified objects.
//!
//! Every dispatched key gets its own task: download, parse, ingest, then a
//! final `completed` or `failed` status. Tasks never share failures. An
//! optional semaphore bounds how many pipelines run at once, and a
//! caller-supplied cancellation token is checked before every stage.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::domain::ProcessingStatus;
use crate::error::ServiceError;
use crate::ingest::{parse_csv, BatchIngestor, IngestReport};
use crate::notifications::NotificationConsumer;
use crate::object_store::ObjectStore;
use crate::status::StatusTracker;

/// Result of one file's pipeline.
#[derive(Debug)]
pub struct FileOutcome {
    pub key: String,
    pub result: Result<IngestReport, ServiceError>,
}

/// Join point for the tasks launched by one dispatch.
///
/// Dropping the handle detaches the tasks; they keep running.
#[derive(Debug, Default)]
pub struct DispatchHandle {
    tasks: Vec<(String, JoinHandle<Result<IngestReport, ServiceError>>)>,
}

impl DispatchHandle {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|(key, _)| key.as_str())
    }

    /// Wait for every task, in dispatch order.
    pub async fn join(self) -> Vec<FileOutcome> {
        let mut outcomes = Vec::with_capacity(self.tasks.len());
        for (key, task) in self.tasks {
            let result = match task.await {
                Ok(result) => result,
                Err(join_error) => Err(ServiceError::internal(format!(
                    "processing task for '{key}' did not finish: {join_error}"
                ))),
            };
            outcomes.push(FileOutcome { key, result });
        }
        outcomes
    }
}

#[derive(Clone)]
pub struct FileProcessor {
    store: Arc<dyn ObjectStore>,
    ingestor: BatchIngestor,
    tracker: StatusTracker,
    limiter: Option<Arc<Semaphore>>,
    cancel: CancellationToken,
}

impl FileProcessor {
    /// An unbounded processor that is never cancelled.
    pub fn new(store: Arc<dyn ObjectStore>, ingestor: BatchIngestor, tracker: StatusTracker) -> Self {
        Self {
            store,
            ingestor,
            tracker,
            limiter: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Run at most `limit` pipelines at the same time.
    #[must_use]
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.limiter = Some(Arc::new(Semaphore::new(limit.max(1))));
        self
    }

    /// Stop every pipeline at its next stage boundary once `cancel` fires.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Mark each key `in_progress` and launch its pipeline. Returns once all
    /// tasks are spawned.
    pub async fn dispatch(&self, keys: Vec<String>) -> DispatchHandle {
        let mut tasks = Vec::with_capacity(keys.len());
        for key in keys {
            if let Err(status_error) = self
                .tracker
                .set_status(&key, ProcessingStatus::InProgress, None)
                .await
            {
                error!(file = %key, error = %status_error, "failed to mark file in progress");
            }

            let processor = self.clone();
            let task_key = key.clone();
            let task = tokio::spawn(async move { processor.process_file(&task_key).await });
            tasks.push((key, task));
        }

        DispatchHandle { tasks }
    }

    /// Run one pipeline inline and record its final status.
    pub async fn process_file(&self, key: &str) -> Result<IngestReport, ServiceError> {
        let result = self.run_stages(key).await;

        let (status, failure) = match &result {
            Ok(_) => (ProcessingStatus::Completed, None),
            Err(pipeline_error) => (ProcessingStatus::Failed, Some(pipeline_error.to_string())),
        };
        if let Err(status_error) = self
            .tracker
            .set_status(key, status, failure.as_deref())
            .await
        {
            error!(file = key, error = %status_error, "failed to record final status");
        }

        result
    }

    /// Poll the queue once and dispatch every key it yields.
    pub async fn poll_and_dispatch(
        &self,
        consumer: &NotificationConsumer,
    ) -> Result<DispatchHandle, ServiceError> {
        let keys = consumer.poll_object_keys().await?;
        if keys.is_empty() {
            return Ok(DispatchHandle::default());
        }

        let handle = self.dispatch(keys).await;
        info!(files = handle.len(), "file pipelines launched");
        Ok(handle)
    }

    async fn run_stages(&self, key: &str) -> Result<IngestReport, ServiceError> {
        let _permit = match &self.limiter {
            Some(limiter) => {
                let permit = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Err(ServiceError::Cancelled),
                    permit = Arc::clone(limiter).acquire_owned() => permit,
                };
                Some(permit.map_err(|_| ServiceError::internal("processing limiter closed"))?)
            }
            None => None,
        };

        self.ensure_active()?;
        let bytes = self.store.download(key).await?;

        self.ensure_active()?;
        let rows = parse_csv(&bytes)?;

        self.ensure_active()?;
        self.ingestor.ingest(&rows).await
    }

    fn ensure_active(&self) -> Result<(), ServiceError> {
        if self.cancel.is_cancelled() {
            Err(ServiceError::Cancelled)
        } else {
            Ok(())
        }
    }
}
