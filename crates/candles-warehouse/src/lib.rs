//! # Candles Warehouse
//!
//! DuckDB-backed storage for OHLC candles and per-file processing statuses.
//!
//! ## Overview
//!
//! The warehouse owns the database file, applies embedded migrations on open,
//! and exposes a small synchronous API over two tables. Timestamps cross this
//! boundary as Unix seconds; the tables store real `TIMESTAMP` columns.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use candles_warehouse::{OhlcRow, Warehouse, WarehouseConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open(WarehouseConfig {
//!         db_path: "candles/warehouse.duckdb".into(),
//!         max_pool_size: 4,
//!     })?;
//!
//!     warehouse.insert_ohlc(&[OhlcRow {
//!         ts: 1_610_000_000,
//!         symbol: "BTC/USD".to_string(),
//!         open: 100.0,
//!         high: 200.0,
//!         low: 50.0,
//!         close: 150.0,
//!     }])?;
//!
//!     let rows = warehouse.query_ohlc("BTC/USD", 1_600_000_000, 1_700_000_000, 100, 0)?;
//!     println!("Found {} rows", rows.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `ohlc_data` | Candles keyed by symbol and time, duplicates allowed |
//! | `process_status` | One lifecycle row per ingested file name |
//! | `schema_migrations` | Applied migration versions |

pub mod duckdb;
pub mod migrations;

use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::Connection;
use ::duckdb::ToSql;
use thiserror::Error;

pub use duckdb::{DuckDbConnectionManager, PooledConnection};

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Request was rejected before reaching the database.
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Configuration for the warehouse database.
///
/// There is no default location; callers resolve the path themselves.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum number of idle connections kept in the pool.
    pub max_pool_size: usize,
}

/// One persisted candle.
#[derive(Debug, Clone, PartialEq)]
pub struct OhlcRow {
    /// Unix seconds.
    pub ts: i64,
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// One persisted processing status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    pub file_name: String,
    pub status: String,
    pub error: Option<String>,
    /// Unix seconds of the first write for this file name.
    pub created_at: i64,
    /// Unix seconds of the latest write.
    pub updated_at: i64,
}

/// The main warehouse interface.
#[derive(Clone)]
pub struct Warehouse {
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    /// Open a warehouse with the specified configuration.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = DuckDbConnectionManager::open(config.db_path, config.max_pool_size)?;
        let warehouse = Self { manager };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    /// Apply pending schema migrations.
    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire()?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    /// Get the path to the database file.
    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    /// Insert candles in a single transaction.
    ///
    /// Either every row lands or none does. An empty slice is a no-op.
    pub fn insert_ohlc(&self, rows: &[OhlcRow]) -> Result<(), WarehouseError> {
        if rows.is_empty() {
            return Ok(());
        }

        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), WarehouseError> {
            let mut statement = connection.prepare(
                "INSERT INTO ohlc_data (time, symbol, open, high, low, close) \
                 VALUES (epoch_ms(CAST(? AS BIGINT) * 1000), ?, ?, ?, ?, ?)",
            )?;
            for row in rows {
                let params: [&dyn ToSql; 6] = [
                    &row.ts,
                    &row.symbol,
                    &row.open,
                    &row.high,
                    &row.low,
                    &row.close,
                ];
                statement.execute(params.as_slice())?;
            }
            Ok(())
        })();

        finalize_transaction(&connection, result)
    }

    /// Fetch one page of candles for `symbol` with `start <= ts <= end`,
    /// oldest first.
    pub fn query_ohlc(
        &self,
        symbol: &str,
        start: i64,
        end: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<OhlcRow>, WarehouseError> {
        if limit < 0 || offset < 0 {
            return Err(WarehouseError::Rejected(format!(
                "limit and offset must be non-negative (limit={limit}, offset={offset})"
            )));
        }

        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(
            "SELECT CAST(epoch(time) AS BIGINT), symbol, open, high, low, close \
             FROM ohlc_data \
             WHERE symbol = ? \
               AND time >= epoch_ms(CAST(? AS BIGINT) * 1000) \
               AND time <= epoch_ms(CAST(? AS BIGINT) * 1000) \
             ORDER BY time ASC \
             LIMIT ? OFFSET ?",
        )?;
        let params: [&dyn ToSql; 5] = [&symbol, &start, &end, &limit, &offset];
        let rows = statement.query_map(params.as_slice(), |row| {
            Ok(OhlcRow {
                ts: row.get(0)?,
                symbol: row.get(1)?,
                open: row.get(2)?,
                high: row.get(3)?,
                low: row.get(4)?,
                close: row.get(5)?,
            })
        })?;

        let mut output = Vec::new();
        for row in rows {
            output.push(row?);
        }
        Ok(output)
    }

    /// Insert or overwrite the status row for `row.file_name`.
    ///
    /// `created_at` of an existing row is kept; everything else is replaced.
    pub fn upsert_status(&self, row: &StatusRow) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire()?;
        let params: [&dyn ToSql; 5] = [
            &row.file_name,
            &row.status,
            &row.error,
            &row.created_at,
            &row.updated_at,
        ];
        connection.execute(
            "INSERT INTO process_status (file_name, status, error, created_at, updated_at) \
             VALUES (?, ?, ?, epoch_ms(CAST(? AS BIGINT) * 1000), epoch_ms(CAST(? AS BIGINT) * 1000)) \
             ON CONFLICT (file_name) DO UPDATE SET \
                status = excluded.status, \
                error = excluded.error, \
                updated_at = excluded.updated_at",
            params.as_slice(),
        )?;
        Ok(())
    }

    /// Look up the status row for `file_name`.
    pub fn get_status(&self, file_name: &str) -> Result<Option<StatusRow>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(
            "SELECT file_name, status, error, \
                    CAST(epoch(created_at) AS BIGINT), CAST(epoch(updated_at) AS BIGINT) \
             FROM process_status WHERE file_name = ?",
        )?;
        let mut rows = statement.query([file_name])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        Ok(Some(StatusRow {
            file_name: row.get(0)?,
            status: row.get(1)?,
            error: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        }))
    }

    /// Delete status rows last updated strictly before `cutoff` (Unix
    /// seconds). Returns the number of rows removed.
    pub fn delete_status_before(&self, cutoff: i64) -> Result<usize, WarehouseError> {
        let connection = self.manager.acquire()?;
        let removed = connection.execute(
            "DELETE FROM process_status WHERE updated_at < epoch_ms(CAST(? AS BIGINT) * 1000)",
            [cutoff],
        )?;
        Ok(removed)
    }
}

/// Finalize a transaction, committing on success or rolling back on failure.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}
