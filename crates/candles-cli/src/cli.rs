//! CLI argument definitions for candles.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ingest` | Load a local CSV file into the warehouse |
//! | `query` | Page through candles for one symbol |
//! | `status` | Show the processing status of a file |
//! | `presign` | Create a presigned upload URL |
//! | `poll` | Run one notification poll and wait for its files |
//! | `cleanup` | Delete stale processing statuses |
//! | `serve` | Run the periodic poll and cleanup triggers |
//!
//! Service settings come from the environment; see `candles_core::config`.

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "candles",
    author,
    version,
    about = "OHLC candle ingestion and range queries"
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest a CSV file with a UNIX,SYMBOL,OPEN,HIGH,LOW,CLOSE header.
    ///
    ///   candles ingest ./btc.csv
    ///   candles ingest ./btc.csv --discard-invalid-rows
    Ingest(IngestArgs),

    /// Query candles for a symbol within a time range, oldest first.
    ///
    ///   candles query --symbol BTC/USD --from 1610000000
    ///   candles query --symbol BTC/USD --from 1610000000 --to 1610086400 --page 2
    Query(QueryArgs),

    /// Show the processing status of an ingested file.
    Status(StatusArgs),

    /// Create a presigned URL for uploading a new CSV file.
    Presign,

    /// Poll the notification queue once and process every announced file.
    Poll,

    /// Delete processing statuses not updated within the retention window.
    Cleanup(CleanupArgs),

    /// Poll and clean up on the configured intervals until interrupted.
    Serve,
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Path of the CSV file.
    pub path: String,

    /// Skip malformed rows instead of rejecting the file.
    #[arg(long, default_value_t = false)]
    pub discard_invalid_rows: bool,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    #[arg(long)]
    pub symbol: String,

    /// Range start, Unix seconds.
    #[arg(long, allow_negative_numbers = true)]
    pub from: i64,

    /// Range end, Unix seconds. Defaults to now.
    #[arg(long, allow_negative_numbers = true)]
    pub to: Option<i64>,

    #[arg(long, allow_negative_numbers = true)]
    pub page: Option<i64>,

    #[arg(long, allow_negative_numbers = true)]
    pub page_size: Option<i64>,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Object key or file name.
    pub file: String,
}

#[derive(Debug, Args)]
pub struct CleanupArgs {
    /// Retention window in days. Defaults to `STATUS_RETENTION_DAYS`.
    #[arg(long)]
    pub days: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_accepts_optional_range_and_paging() {
        let cli = Cli::try_parse_from([
            "candles",
            "query",
            "--symbol",
            "BTC/USD",
            "--from",
            "1610000000",
            "--page",
            "2",
            "--pretty",
        ])
        .expect("valid arguments");

        assert!(cli.pretty);
        match cli.command {
            Command::Query(args) => {
                assert_eq!(args.symbol, "BTC/USD");
                assert_eq!(args.from, 1_610_000_000);
                assert_eq!(args.to, None);
                assert_eq!(args.page, Some(2));
                assert_eq!(args.page_size, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn query_requires_symbol_and_from() {
        assert!(Cli::try_parse_from(["candles", "query", "--from", "1"]).is_err());
        assert!(Cli::try_parse_from(["candles", "query", "--symbol", "BTC"]).is_err());
    }

    #[test]
    fn ingest_takes_path_and_discard_flag() {
        let cli = Cli::try_parse_from(["candles", "ingest", "data.csv", "--discard-invalid-rows"])
            .expect("valid arguments");

        match cli.command {
            Command::Ingest(args) => {
                assert_eq!(args.path, "data.csv");
                assert!(args.discard_invalid_rows);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn cleanup_days_is_optional() {
        let cli = Cli::try_parse_from(["candles", "cleanup"]).expect("valid arguments");
        assert!(matches!(cli.command, Command::Cleanup(CleanupArgs { days: None })));

        let cli = Cli::try_parse_from(["candles", "cleanup", "--days", "3"]).expect("valid arguments");
        assert!(matches!(cli.command, Command::Cleanup(CleanupArgs { days: Some(3) })));
    }
}
