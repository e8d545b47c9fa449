//! Object storage seam and presigned upload URLs.

use serde::Serialize;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::repository::BoxFuture;

/// Storage holding uploaded CSV files.
pub trait ObjectStore: Send + Sync {
    /// Fetch the full content of `key`.
    fn download<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<u8>, ServiceError>>;

    /// A URL a client can `PUT` the object `key` to.
    fn presign_upload<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<String, ServiceError>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresignedUpload {
    pub url: String,
    pub filename: String,
}

/// Pick a fresh `<uuid>.csv` object name and presign an upload for it.
pub async fn generate_presigned_upload(
    store: &dyn ObjectStore,
) -> Result<PresignedUpload, ServiceError> {
    let filename = format!("{}.csv", Uuid::new_v4());
    let url = store.presign_upload(&filename).await?;
    Ok(PresignedUpload { url, filename })
}
