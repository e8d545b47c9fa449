use candles_core::{generate_presigned_upload, S3ObjectStore, ServiceConfig};
use serde_json::Value;

use crate::error::CliError;

pub async fn run(config: &ServiceConfig) -> Result<Value, CliError> {
    let store = S3ObjectStore::connect(config.s3.clone()).await;
    let upload = generate_presigned_upload(&store).await?;
    Ok(serde_json::to_value(&upload)?)
}
