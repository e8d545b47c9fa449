use candles_warehouse::OhlcRow;
use serde::Serialize;
use time::{Duration, OffsetDateTime};

use crate::error::RowError;

/// Unix seconds of 0001-01-01T00:00:00Z, the timestamp of a record whose
/// time was never read.
const UNSET_UNIX: i64 = -62_135_596_800;

/// One open-high-low-close candle for a symbol at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OhlcRecord {
    #[serde(rename = "unix", with = "time::serde::timestamp")]
    pub time: OffsetDateTime,
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl OhlcRecord {
    /// A record with nothing set: unset time, empty symbol, zero prices.
    pub fn unset() -> Self {
        Self {
            time: OffsetDateTime::UNIX_EPOCH.saturating_sub(Duration::seconds(-UNSET_UNIX)),
            symbol: String::new(),
            open: 0.0,
            high: 0.0,
            low: 0.0,
            close: 0.0,
        }
    }

    /// A record with the unset timestamp, an empty symbol or any price equal
    /// to exactly `0.0` is treated as missing data. The Unix epoch itself is
    /// a valid time.
    pub fn is_incomplete(&self) -> bool {
        self.time.unix_timestamp() == UNSET_UNIX
            || self.symbol.is_empty()
            || [self.open, self.high, self.low, self.close].contains(&0.0)
    }

    pub fn to_row(&self) -> OhlcRow {
        OhlcRow {
            ts: self.time.unix_timestamp(),
            symbol: self.symbol.clone(),
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
        }
    }

    pub fn from_row(row: OhlcRow) -> Result<Self, RowError> {
        let time = OffsetDateTime::from_unix_timestamp(row.ts)
            .map_err(|_| RowError::TimestampOutOfRange { value: row.ts })?;
        Ok(Self {
            time,
            symbol: row.symbol,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
        })
    }
}
