//! # Candles Core
//!
//! Ingestion pipeline and query path for OHLC candles delivered as CSV.
//!
//! ## Overview
//!
//! - **Header resolution** maps CSV header cells to canonical column positions
//! - **Row extraction** turns one raw row into a validated candle
//! - **Batch ingestion** applies the discard policy and bulk-inserts a payload
//! - **Status tracking** records the lifecycle of every ingested file
//! - **Notification consumption** turns queue messages into object keys
//! - **File processing** runs one independent pipeline per notified file
//! - **Range queries** validate and page time-range requests by symbol
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | S3 object store and SQS queue |
//! | [`config`] | Environment-driven configuration |
//! | [`domain`] | Candle and status models |
//! | [`error`] | Error taxonomy |
//! | [`extract`] | Row extraction |
//! | [`fields`] | Header resolution |
//! | [`ingest`] | Batch ingestion and CSV parsing |
//! | [`notifications`] | Queue polling and key extraction |
//! | [`object_store`] | Object storage seam and presigned uploads |
//! | [`processor`] | Per-file asynchronous pipelines |
//! | [`query`] | Paginated range queries |
//! | [`repository`] | Storage seam and its `DuckDB` implementation |
//! | [`status`] | Processing status tracker |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use candles_core::{BatchIngestor, RangeQuery, RangeQueryService, ServiceConfig};
//! use candles_warehouse::Warehouse;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::from_env().config;
//!     let warehouse = Arc::new(Warehouse::open(config.warehouse_config())?);
//!
//!     let ingestor = BatchIngestor::new(warehouse.clone(), true);
//!     ingestor
//!         .ingest_csv(b"UNIX,SYMBOL,OPEN,HIGH,LOW,CLOSE\n1610000000,BTC/USD,100,200,50,150\n")
//!         .await?;
//!
//!     let service = RangeQueryService::new(warehouse, 100);
//!     let page = service
//!         .query(RangeQuery {
//!             symbol: "BTC/USD".to_string(),
//!             start: 1_600_000_000,
//!             ..RangeQuery::default()
//!         })
//!         .await?;
//!     println!("page {} has {} candles", page.page, page.records.len());
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod extract;
pub mod fields;
pub mod ingest;
pub mod notifications;
pub mod object_store;
pub mod processor;
pub mod query;
pub mod repository;
pub mod status;

#[cfg(test)]
mod testing;

pub use adapters::{S3ObjectStore, SqsQueue};
pub use config::{LoadedConfig, S3Config, ServiceConfig, SqsConfig};
pub use domain::{OhlcRecord, ProcessingStatus, StatusEntry};
pub use error::{ErrorKind, RowError, ServiceError};
pub use extract::extract_record;
pub use fields::{CanonicalField, FieldIndexes};
pub use ingest::{parse_csv, BatchIngestor, IngestReport};
pub use notifications::{extract_object_keys, NotificationConsumer, NotificationQueue, QueueMessage};
pub use object_store::{generate_presigned_upload, ObjectStore, PresignedUpload};
pub use processor::{DispatchHandle, FileOutcome, FileProcessor};
pub use query::{QueryValidationError, RangePage, RangeQuery, RangeQueryService, ResolvedQuery};
pub use repository::{BoxFuture, Repository};
pub use status::StatusTracker;
