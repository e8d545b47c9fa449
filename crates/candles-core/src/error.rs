use candles_warehouse::WarehouseError;
use thiserror::Error;

use crate::fields::CanonicalField;
use crate::query::QueryValidationError;

/// Coarse classification surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    Internal,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
        }
    }
}

/// Why a single data row could not become a candle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowError {
    #[error("{field} expected at column {index} but the row has {len} cells")]
    MissingCell {
        field: CanonicalField,
        index: usize,
        len: usize,
    },

    #[error("invalid {field} value '{value}'")]
    InvalidNumber { field: CanonicalField, value: String },

    #[error("unix timestamp {value} is out of range")]
    TimestampOutOfRange { value: i64 },

    #[error("incomplete row: zero timestamp, empty symbol or zero price")]
    Incomplete,
}

/// Errors returned by the ingestion and query services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid csv header, missing {}", join_fields(.missing))]
    InvalidHeader { missing: Vec<CanonicalField> },

    #[error("invalid csv row {row}: {source}")]
    InvalidRow {
        row: usize,
        #[source]
        source: RowError,
    },

    #[error(transparent)]
    InvalidQuery(#[from] QueryValidationError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },

    #[error(transparent)]
    Storage(#[from] WarehouseError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("processing cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidHeader { .. }
            | Self::InvalidRow { .. }
            | Self::InvalidQuery(_)
            | Self::InvalidArgument(_)
            | Self::Csv(_) => ErrorKind::InvalidArgument,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Storage(_) | Self::Transport(_) | Self::Cancelled | Self::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Stable machine-readable code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidHeader { .. } => "invalid_header",
            Self::InvalidRow { .. } => "invalid_row",
            Self::InvalidQuery(_) => "invalid_query",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Csv(_) => "malformed_csv",
            Self::NotFound { .. } => "not_found",
            Self::Storage(_) => "storage",
            Self::Transport(_) => "transport",
            Self::Cancelled => "cancelled",
            Self::Internal(_) => "internal",
        }
    }
}

fn join_fields(fields: &[CanonicalField]) -> String {
    fields
        .iter()
        .map(|field| field.token())
        .collect::<Vec<_>>()
        .join(", ")
}
