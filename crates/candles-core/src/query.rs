//! Paginated time-range queries by symbol.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::OhlcRecord;
use crate::error::ServiceError;
use crate::repository::Repository;

/// A range request as received from a caller, times in Unix seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeQuery {
    pub symbol: String,
    pub start: i64,
    pub end: Option<i64>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryValidationError {
    #[error("symbol is required")]
    MissingSymbol,

    #[error("from is required")]
    MissingStart,

    #[error("to must be greater than from")]
    EndBeforeStart,

    #[error("page size must be greater than 0")]
    InvalidPageSize,

    #[error("page number must be greater than 0")]
    InvalidPageNumber,

    #[error("time {value} is outside the supported range")]
    TimestampOutOfRange { value: i64 },
}

/// A validated request with every default applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQuery {
    pub symbol: String,
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
    pub page: i64,
    pub page_size: i64,
}

impl ResolvedQuery {
    pub const fn limit(&self) -> i64 {
        self.page_size
    }

    pub const fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl RangeQuery {
    /// Validate in a fixed order and fill defaults: `end = now`, `page = 1`,
    /// `page_size = default_page_size`.
    pub fn resolve(
        self,
        default_page_size: i64,
        now: OffsetDateTime,
    ) -> Result<ResolvedQuery, QueryValidationError> {
        if self.symbol.is_empty() {
            return Err(QueryValidationError::MissingSymbol);
        }
        if self.start <= 0 {
            return Err(QueryValidationError::MissingStart);
        }
        if matches!(self.end, Some(end) if end < self.start) {
            return Err(QueryValidationError::EndBeforeStart);
        }
        if matches!(self.page_size, Some(size) if size <= 0) {
            return Err(QueryValidationError::InvalidPageSize);
        }
        if matches!(self.page, Some(page) if page <= 0) {
            return Err(QueryValidationError::InvalidPageNumber);
        }

        let start = to_datetime(self.start)?;
        let end = match self.end {
            Some(end) => to_datetime(end)?,
            None => now,
        };

        Ok(ResolvedQuery {
            symbol: self.symbol,
            start,
            end,
            page: self.page.unwrap_or(1),
            page_size: self.page_size.unwrap_or(default_page_size),
        })
    }
}

fn to_datetime(value: i64) -> Result<OffsetDateTime, QueryValidationError> {
    OffsetDateTime::from_unix_timestamp(value)
        .map_err(|_| QueryValidationError::TimestampOutOfRange { value })
}

/// One page of results and the page number it represents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangePage {
    #[serde(rename = "data")]
    pub records: Vec<OhlcRecord>,
    pub page: i64,
}

#[derive(Clone)]
pub struct RangeQueryService {
    repository: Arc<dyn Repository>,
    default_page_size: i64,
}

impl RangeQueryService {
    pub fn new(repository: Arc<dyn Repository>, default_page_size: i64) -> Self {
        Self {
            repository,
            default_page_size: default_page_size.max(1),
        }
    }

    pub async fn query(&self, request: RangeQuery) -> Result<RangePage, ServiceError> {
        let resolved = request.resolve(self.default_page_size, OffsetDateTime::now_utc())?;
        let records = self.repository.query_records(&resolved).await?;
        Ok(RangePage {
            records,
            page: resolved.page,
        })
    }
}
