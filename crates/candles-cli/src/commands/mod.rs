mod cleanup;
mod ingest;
mod poll;
mod presign;
mod query;
mod serve;
mod status;

use std::sync::Arc;

use candles_core::{BatchIngestor, FileProcessor, ObjectStore, ServiceConfig, StatusTracker};
use candles_warehouse::Warehouse;
use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli, config: &ServiceConfig) -> Result<Value, CliError> {
    match &cli.command {
        Command::Ingest(args) => ingest::run(args, config).await,
        Command::Query(args) => query::run(args, config).await,
        Command::Status(args) => status::run(args, config).await,
        Command::Presign => presign::run(config).await,
        Command::Poll => poll::run(config).await,
        Command::Cleanup(args) => cleanup::run(args, config).await,
        Command::Serve => serve::run(config).await,
    }
}

fn open_warehouse(config: &ServiceConfig) -> Result<Arc<Warehouse>, CliError> {
    Ok(Arc::new(Warehouse::open(config.warehouse_config())?))
}

/// Processor wired to the configured warehouse, discard policy and
/// concurrency cap.
fn file_processor(
    config: &ServiceConfig,
    warehouse: Arc<Warehouse>,
    store: Arc<dyn ObjectStore>,
) -> FileProcessor {
    let processor = FileProcessor::new(
        store,
        BatchIngestor::new(warehouse.clone(), config.discard_invalid_rows),
        StatusTracker::new(warehouse),
    );
    match config.max_concurrent_files {
        Some(limit) => processor.with_max_concurrency(limit),
        None => processor,
    }
}
