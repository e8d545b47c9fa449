use candles_core::{RangeQuery, RangeQueryService, ServiceConfig};
use serde_json::Value;

use crate::cli::QueryArgs;
use crate::error::CliError;

use super::open_warehouse;

pub async fn run(args: &QueryArgs, config: &ServiceConfig) -> Result<Value, CliError> {
    let warehouse = open_warehouse(config)?;
    let service = RangeQueryService::new(warehouse, config.default_page_size);

    let page = service
        .query(RangeQuery {
            symbol: args.symbol.clone(),
            start: args.from,
            end: args.to,
            page: args.page,
            page_size: args.page_size,
        })
        .await?;

    Ok(serde_json::to_value(&page)?)
}
