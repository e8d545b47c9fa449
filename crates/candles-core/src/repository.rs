//! Storage seam for candles and processing statuses.
//!
//! The warehouse is synchronous; its implementation of [`Repository`] moves
//! each call onto the blocking pool so async callers never stall a runtime
//! worker on `DuckDB` I/O.

use std::future::Future;
use std::pin::Pin;

use candles_warehouse::{OhlcRow, StatusRow, Warehouse, WarehouseError};
use time::OffsetDateTime;

use crate::domain::{OhlcRecord, ProcessingStatus, StatusEntry};
use crate::error::ServiceError;
use crate::query::ResolvedQuery;

/// Boxed `Send` future returned by the async seams of this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Relational storage used by the ingestion, status and query services.
pub trait Repository: Send + Sync {
    /// Insert all records or none of them.
    fn insert_records<'a>(
        &'a self,
        records: &'a [OhlcRecord],
    ) -> BoxFuture<'a, Result<(), ServiceError>>;

    /// One page of records matching `query`, ordered by time ascending.
    fn query_records<'a>(
        &'a self,
        query: &'a ResolvedQuery,
    ) -> BoxFuture<'a, Result<Vec<OhlcRecord>, ServiceError>>;

    /// Insert or overwrite the entry keyed by its file name.
    fn upsert_status<'a>(&'a self, entry: &'a StatusEntry)
        -> BoxFuture<'a, Result<(), ServiceError>>;

    fn get_status<'a>(
        &'a self,
        file_name: &'a str,
    ) -> BoxFuture<'a, Result<Option<StatusEntry>, ServiceError>>;

    /// Delete entries whose last update is strictly before `cutoff`.
    fn delete_status_before<'a>(
        &'a self,
        cutoff: OffsetDateTime,
    ) -> BoxFuture<'a, Result<usize, ServiceError>>;
}

impl Repository for Warehouse {
    fn insert_records<'a>(
        &'a self,
        records: &'a [OhlcRecord],
    ) -> BoxFuture<'a, Result<(), ServiceError>> {
        let warehouse = self.clone();
        let rows: Vec<OhlcRow> = records.iter().map(OhlcRecord::to_row).collect();
        Box::pin(run_blocking(move || warehouse.insert_ohlc(&rows)))
    }

    fn query_records<'a>(
        &'a self,
        query: &'a ResolvedQuery,
    ) -> BoxFuture<'a, Result<Vec<OhlcRecord>, ServiceError>> {
        let warehouse = self.clone();
        let query = query.clone();
        Box::pin(async move {
            let rows = run_blocking(move || {
                warehouse.query_ohlc(
                    &query.symbol,
                    query.start.unix_timestamp(),
                    query.end.unix_timestamp(),
                    query.limit(),
                    query.offset(),
                )
            })
            .await?;

            let records: Result<Vec<OhlcRecord>, ServiceError> = rows
                .into_iter()
                .map(|row| {
                    OhlcRecord::from_row(row)
                        .map_err(|error| ServiceError::internal(error.to_string()))
                })
                .collect();
            records
        })
    }

    fn upsert_status<'a>(
        &'a self,
        entry: &'a StatusEntry,
    ) -> BoxFuture<'a, Result<(), ServiceError>> {
        let warehouse = self.clone();
        let row = StatusRow {
            file_name: entry.file_name.clone(),
            status: entry.status.as_str().to_string(),
            error: entry.error.clone(),
            created_at: entry.created_at.unix_timestamp(),
            updated_at: entry.updated_at.unix_timestamp(),
        };
        Box::pin(run_blocking(move || warehouse.upsert_status(&row)))
    }

    fn get_status<'a>(
        &'a self,
        file_name: &'a str,
    ) -> BoxFuture<'a, Result<Option<StatusEntry>, ServiceError>> {
        let warehouse = self.clone();
        let file_name = file_name.to_string();
        Box::pin(async move {
            let row = run_blocking(move || warehouse.get_status(&file_name)).await?;
            let entry: Result<Option<StatusEntry>, ServiceError> =
                row.map(status_entry_from_row).transpose();
            entry
        })
    }

    fn delete_status_before<'a>(
        &'a self,
        cutoff: OffsetDateTime,
    ) -> BoxFuture<'a, Result<usize, ServiceError>> {
        let warehouse = self.clone();
        let cutoff = cutoff.unix_timestamp();
        Box::pin(run_blocking(move || warehouse.delete_status_before(cutoff)))
    }
}

async fn run_blocking<T, F>(task: F) -> Result<T, ServiceError>
where
    F: FnOnce() -> Result<T, WarehouseError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|error| ServiceError::internal(format!("storage task failed: {error}")))?
        .map_err(ServiceError::from)
}

fn status_entry_from_row(row: StatusRow) -> Result<StatusEntry, ServiceError> {
    let status: ProcessingStatus = row
        .status
        .parse()
        .map_err(|error| ServiceError::internal(format!("{error}")))?;

    Ok(StatusEntry {
        file_name: row.file_name,
        status,
        error: row.error,
        created_at: unix_to_datetime(row.created_at)?,
        updated_at: unix_to_datetime(row.updated_at)?,
    })
}

fn unix_to_datetime(seconds: i64) -> Result<OffsetDateTime, ServiceError> {
    OffsetDateTime::from_unix_timestamp(seconds)
        .map_err(|_| ServiceError::internal(format!("stored timestamp {seconds} is out of range")))
}
