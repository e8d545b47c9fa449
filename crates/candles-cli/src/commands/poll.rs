use std::sync::Arc;

use candles_core::{FileOutcome, NotificationConsumer, S3ObjectStore, ServiceConfig, SqsQueue};
use serde_json::{json, Value};

use crate::error::CliError;

use super::{file_processor, open_warehouse};

/// One poll cycle, waiting for every launched file before returning.
pub async fn run(config: &ServiceConfig) -> Result<Value, CliError> {
    let warehouse = open_warehouse(config)?;
    let store = Arc::new(S3ObjectStore::connect(config.s3.clone()).await);
    let consumer = NotificationConsumer::new(Arc::new(SqsQueue::connect(&config.sqs).await?));

    let processor = file_processor(config, warehouse, store);
    let outcomes = processor.poll_and_dispatch(&consumer).await?.join().await;

    Ok(json!({
        "files": outcomes.iter().map(outcome_json).collect::<Vec<_>>(),
    }))
}

fn outcome_json(outcome: &FileOutcome) -> Value {
    match &outcome.result {
        Ok(report) => json!({
            "file": outcome.key,
            "status": "completed",
            "accepted": report.accepted,
            "discarded": report.discarded,
        }),
        Err(error) => json!({
            "file": outcome.key,
            "status": "failed",
            "code": error.code(),
            "error": error.to_string(),
        }),
    }
}
