//! Per-file processing status tracking.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::{debug, error};

use crate::domain::{ProcessingStatus, StatusEntry};
use crate::error::ServiceError;
use crate::repository::Repository;

#[derive(Clone)]
pub struct StatusTracker {
    repository: Arc<dyn Repository>,
}

impl StatusTracker {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Overwrite the status of `file_name`, creating the entry if needed.
    pub async fn set_status(
        &self,
        file_name: &str,
        status: ProcessingStatus,
        failure: Option<&str>,
    ) -> Result<(), ServiceError> {
        let now = OffsetDateTime::now_utc();
        let entry = StatusEntry {
            file_name: file_name.to_string(),
            status,
            error: failure.map(str::to_string),
            created_at: now,
            updated_at: now,
        };

        match (status, failure) {
            (ProcessingStatus::Failed, Some(reason)) => {
                error!(file = file_name, error = reason, "file processing failed");
            }
            _ => debug!(file = file_name, status = %status, "processing status updated"),
        }

        self.repository.upsert_status(&entry).await
    }

    pub async fn get_status(&self, file_name: &str) -> Result<StatusEntry, ServiceError> {
        self.repository
            .get_status(file_name)
            .await?
            .ok_or_else(|| ServiceError::NotFound {
                entity: "processing status",
                key: file_name.to_string(),
            })
    }

    /// Remove entries last updated more than `older_than` ago. Returns how
    /// many were removed.
    pub async fn delete_stale(&self, older_than: Duration) -> Result<usize, ServiceError> {
        let window = time::Duration::try_from(older_than).map_err(|_| {
            ServiceError::invalid_argument(format!("retention window {older_than:?} is too large"))
        })?;
        let cutoff = OffsetDateTime::now_utc().checked_sub(window).ok_or_else(|| {
            ServiceError::invalid_argument(format!("retention window {older_than:?} is too large"))
        })?;

        let removed = self.repository.delete_status_before(cutoff).await?;
        debug!(removed, "stale processing statuses deleted");
        Ok(removed)
    }
}
