//! Periodic triggers: poll-and-dispatch and stale-status cleanup.

use std::sync::Arc;

use candles_core::{
    FileProcessor, NotificationConsumer, S3ObjectStore, ServiceConfig, SqsQueue, StatusTracker,
};
use serde_json::Value;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::CliError;

use super::{file_processor, open_warehouse};

/// Run until Ctrl-C. Launched file pipelines are detached from the cycle
/// that found them; shutdown cancels them at their next stage.
pub async fn run(config: &ServiceConfig) -> Result<Value, CliError> {
    let warehouse = open_warehouse(config)?;
    let store = Arc::new(S3ObjectStore::connect(config.s3.clone()).await);
    let consumer = NotificationConsumer::new(Arc::new(SqsQueue::connect(&config.sqs).await?));
    let tracker = StatusTracker::new(warehouse.clone());
    let shutdown = CancellationToken::new();
    let processor = file_processor(config, warehouse, store).with_cancellation(shutdown.clone());

    let mut poll_timer = interval(config.poll_interval);
    poll_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut cleanup_timer = interval(config.cleanup_interval);
    cleanup_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        poll_every = ?config.poll_interval,
        cleanup_every = ?config.cleanup_interval,
        "scheduler started"
    );

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(signal_error) = signal {
                    error!(error = %signal_error, "failed to listen for shutdown signal");
                }
                break;
            }
            _ = poll_timer.tick() => poll_cycle(&processor, &consumer).await,
            _ = cleanup_timer.tick() => cleanup_cycle(&tracker, config).await,
        }
    }

    info!("scheduler stopping");
    shutdown.cancel();
    Ok(Value::Null)
}

async fn poll_cycle(processor: &FileProcessor, consumer: &NotificationConsumer) {
    match processor.poll_and_dispatch(consumer).await {
        Ok(handle) if handle.is_empty() => {}
        Ok(handle) => info!(files = handle.len(), "poll cycle dispatched files"),
        Err(poll_error) => error!(error = %poll_error, "poll cycle failed"),
    }
}

async fn cleanup_cycle(tracker: &StatusTracker, config: &ServiceConfig) {
    match tracker.delete_stale(config.status_retention).await {
        Ok(removed) => info!(removed, "cleanup cycle finished"),
        Err(cleanup_error) => error!(error = %cleanup_error, "cleanup cycle failed"),
    }
}
