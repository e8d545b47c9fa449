//! Batch ingestion of a CSV payload under the discard policy.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::OhlcRecord;
use crate::error::ServiceError;
use crate::extract::extract_record;
use crate::fields::FieldIndexes;
use crate::repository::Repository;

/// Outcome of one successful batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub accepted: usize,
    pub discarded: usize,
}

/// Drives header resolution and row extraction over a whole payload, then
/// inserts every accepted row in one call.
#[derive(Clone)]
pub struct BatchIngestor {
    repository: Arc<dyn Repository>,
    discard_invalid_rows: bool,
}

impl BatchIngestor {
    pub fn new(repository: Arc<dyn Repository>, discard_invalid_rows: bool) -> Self {
        Self {
            repository,
            discard_invalid_rows,
        }
    }

    /// Ingest `rows`, where row 0 is the header.
    ///
    /// An empty payload is a no-op. An incomplete header fails before any
    /// data row is read. With the discard policy off, the first bad row
    /// aborts the batch and nothing is inserted.
    pub async fn ingest(&self, rows: &[Vec<String>]) -> Result<IngestReport, ServiceError> {
        let Some((header, data)) = rows.split_first() else {
            return Ok(IngestReport::default());
        };

        let indexes = FieldIndexes::resolve(header.as_slice());
        if !indexes.is_complete() {
            return Err(ServiceError::InvalidHeader {
                missing: indexes.missing(),
            });
        }

        let mut report = IngestReport::default();
        let mut records: Vec<OhlcRecord> = Vec::with_capacity(data.len());
        for (position, row) in data.iter().enumerate() {
            match extract_record(row.as_slice(), &indexes) {
                Ok(record) => records.push(record),
                Err(source) if self.discard_invalid_rows => {
                    warn!(row = position + 1, error = %source, "discarding invalid csv row");
                    report.discarded += 1;
                }
                Err(source) => {
                    return Err(ServiceError::InvalidRow {
                        row: position + 1,
                        source,
                    })
                }
            }
        }

        report.accepted = records.len();
        if !records.is_empty() {
            self.repository.insert_records(&records).await?;
        }

        debug!(
            accepted = report.accepted,
            discarded = report.discarded,
            "csv batch ingested"
        );
        Ok(report)
    }

    /// Parse raw CSV bytes and ingest them.
    pub async fn ingest_csv(&self, bytes: &[u8]) -> Result<IngestReport, ServiceError> {
        let rows = parse_csv(bytes)?;
        self.ingest(&rows).await
    }
}

/// Split a CSV payload into rows of cells.
///
/// Every line, including the first, is returned as data; rows may have
/// different lengths.
pub fn parse_csv(bytes: &[u8]) -> Result<Vec<Vec<String>>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}
