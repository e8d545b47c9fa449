use candles_core::BatchIngestor;
use candles_core::ServiceConfig;
use serde_json::{json, Value};
use tracing::info;

use crate::cli::IngestArgs;
use crate::error::CliError;

use super::open_warehouse;

pub async fn run(args: &IngestArgs, config: &ServiceConfig) -> Result<Value, CliError> {
    let bytes = tokio::fs::read(&args.path).await?;
    let warehouse = open_warehouse(config)?;

    let discard = args.discard_invalid_rows || config.discard_invalid_rows;
    let report = BatchIngestor::new(warehouse, discard)
        .ingest_csv(&bytes)
        .await?;
    info!(file = %args.path, accepted = report.accepted, "file ingested");

    Ok(json!({
        "file": args.path,
        "accepted": report.accepted,
        "discarded": report.discarded,
    }))
}
