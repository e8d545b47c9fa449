//! # Domain Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`OhlcRecord`] | One validated candle |
//! | [`ProcessingStatus`] | Lifecycle state of an ingested file |
//! | [`StatusEntry`] | Persisted status of one file |

mod ohlc;
mod status;

pub use ohlc::OhlcRecord;
pub use status::{ProcessingStatus, StatusEntry, UnknownStatus};
