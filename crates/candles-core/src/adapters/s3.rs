use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;

use crate::config::S3Config;
use crate::error::ServiceError;
use crate::object_store::ObjectStore;
use crate::repository::BoxFuture;

/// [`ObjectStore`] backed by one S3 bucket.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    config: S3Config,
}

impl S3ObjectStore {
    /// Build a client from the default AWS credential chain for the
    /// configured region.
    pub async fn connect(config: S3Config) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;
        Self::with_client(Client::new(&sdk_config), config)
    }

    pub fn with_client(client: Client, config: S3Config) -> Self {
        Self { client, config }
    }
}

impl ObjectStore for S3ObjectStore {
    fn download<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<u8>, ServiceError>> {
        Box::pin(async move {
            let response = self
                .client
                .get_object()
                .bucket(self.config.bucket.as_str())
                .key(key)
                .send()
                .await
                .map_err(|error| {
                    ServiceError::transport(format!(
                        "download of '{key}' failed: {}",
                        DisplayErrorContext(&error)
                    ))
                })?;

            let data = response.body.collect().await.map_err(|error| {
                ServiceError::transport(format!("reading '{key}' failed: {error}"))
            })?;
            Ok(data.into_bytes().to_vec())
        })
    }

    fn presign_upload<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<String, ServiceError>> {
        Box::pin(async move {
            let presigning = PresigningConfig::expires_in(self.config.presign_expiry)
                .map_err(|error| ServiceError::invalid_argument(error.to_string()))?;

            let request = self
                .client
                .put_object()
                .bucket(self.config.bucket.as_str())
                .key(key)
                .presigned(presigning)
                .await
                .map_err(|error| {
                    ServiceError::transport(format!(
                        "presigning '{key}' failed: {}",
                        DisplayErrorContext(&error)
                    ))
                })?;
            Ok(request.uri().to_string())
        })
    }
}
