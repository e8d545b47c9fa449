use std::time::Duration;

use candles_core::{ServiceConfig, StatusTracker};
use serde_json::{json, Value};

use crate::cli::CleanupArgs;
use crate::error::CliError;

use super::open_warehouse;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

pub async fn run(args: &CleanupArgs, config: &ServiceConfig) -> Result<Value, CliError> {
    let retention = match args.days {
        Some(days) => DAY
            .checked_mul(u32::try_from(days).map_err(|_| {
                CliError::Command(format!("retention of {days} days is too large"))
            })?)
            .ok_or_else(|| CliError::Command(format!("retention of {days} days is too large")))?,
        None => config.status_retention,
    };

    let tracker = StatusTracker::new(open_warehouse(config)?);
    let removed = tracker.delete_stale(retention).await?;

    Ok(json!({
        "retention_days": retention.as_secs() / DAY.as_secs(),
        "removed": removed,
    }))
}
