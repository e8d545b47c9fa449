//! Environment-driven service configuration.
//!
//! The loader reads through a lookup function and returns the list of every
//! variable it consulted alongside the values, so nothing is recorded in
//! process-wide state.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use candles_warehouse::WarehouseConfig;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Config {
    pub region: String,
    pub bucket: String,
    pub presign_expiry: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqsConfig {
    pub region: String,
    pub queue: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub db_path: PathBuf,
    pub db_pool_size: usize,
    /// Skip malformed rows instead of failing the batch.
    pub discard_invalid_rows: bool,
    pub default_page_size: i64,
    pub s3: S3Config,
    pub sqs: SqsConfig,
    pub poll_interval: Duration,
    pub cleanup_interval: Duration,
    pub status_retention: Duration,
    /// `None` leaves file pipelines unbounded.
    pub max_concurrent_files: Option<usize>,
}

/// Configuration plus the variable names consulted to build it, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfig {
    pub config: ServiceConfig,
    pub keys: Vec<&'static str>,
}

impl ServiceConfig {
    pub fn from_env() -> LoadedConfig {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> LoadedConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut reader = EnvReader {
            lookup,
            keys: Vec::new(),
        };

        let home = reader
            .optional("CANDLES_HOME")
            .map(PathBuf::from)
            .or_else(|| reader.optional("HOME").map(|home| PathBuf::from(home).join(".candles")))
            .unwrap_or_else(|| PathBuf::from(".candles"));
        let db_path = reader
            .optional("CANDLES_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join("warehouse.duckdb"));

        let config = Self {
            db_path,
            db_pool_size: reader.number("CANDLES_DB_POOL_SIZE", 4_u64).max(1) as usize,
            discard_invalid_rows: reader.flag("OHLC_DISCARD_INCOMPLETE_ROW", false),
            default_page_size: reader.number("OHLC_DATA_POINT_LIMIT", 100_i64).max(1),
            s3: S3Config {
                region: reader.string("S3_REGION", "eu-west-1"),
                bucket: reader.string("S3_BUCKET", "coiny-data-bucket"),
                presign_expiry: scaled(
                    reader.number("S3_PRESIGN_URL_EXPIRY_TIME", 2_u64).max(1),
                    2,
                    HOUR,
                ),
            },
            sqs: SqsConfig {
                region: reader.string("SQS_REGION", "eu-west-1"),
                queue: reader.string("SQS_QUEUE", "candle-files-notification-fifo"),
            },
            poll_interval: scaled(
                reader.number("CRON_JOB_FREQUENCY_IN_MINUTES", 2_u64).max(1),
                2,
                MINUTE,
            ),
            cleanup_interval: scaled(
                reader
                    .number("CLEANUP_CRON_JOB_FREQUENCY_IN_DAYS", 1_u64)
                    .max(1),
                1,
                DAY,
            ),
            status_retention: scaled(reader.number("STATUS_RETENTION_DAYS", 1_u64), 1, DAY),
            max_concurrent_files: reader
                .optional("CANDLES_MAX_CONCURRENT_FILES")
                .and_then(|value| value.parse::<usize>().ok())
                .filter(|limit| *limit > 0),
        };

        LoadedConfig {
            config,
            keys: reader.keys,
        }
    }

    pub fn warehouse_config(&self) -> WarehouseConfig {
        WarehouseConfig {
            db_path: self.db_path.clone(),
            max_pool_size: self.db_pool_size,
        }
    }
}

/// `value` units of `unit` seconds, or `default` units when that overflows.
fn scaled(value: u64, default: u64, unit: u64) -> Duration {
    Duration::from_secs(value.checked_mul(unit).unwrap_or(default * unit))
}

struct EnvReader<F> {
    lookup: F,
    keys: Vec<&'static str>,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Trimmed value, with empty values treated as unset.
    fn optional(&mut self, key: &'static str) -> Option<String> {
        self.keys.push(key);
        (self.lookup)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn string(&mut self, key: &'static str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn number<T: std::str::FromStr>(&mut self, key: &'static str, default: T) -> T {
        self.optional(key)
            .and_then(|value| value.parse().ok())
            .unwrap_or(default)
    }

    /// Only the exact value `true` enables a flag that is set.
    fn flag(&mut self, key: &'static str, default: bool) -> bool {
        match self.optional(key) {
            Some(value) => value == "true",
            None => default,
        }
    }
}
