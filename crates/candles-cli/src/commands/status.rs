use candles_core::{ServiceConfig, StatusTracker};
use serde_json::Value;

use crate::cli::StatusArgs;
use crate::error::CliError;

use super::open_warehouse;

pub async fn run(args: &StatusArgs, config: &ServiceConfig) -> Result<Value, CliError> {
    let tracker = StatusTracker::new(open_warehouse(config)?);
    let entry = tracker.get_status(&args.file).await?;
    Ok(serde_json::to_value(&entry)?)
}
