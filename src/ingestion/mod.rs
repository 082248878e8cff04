//! Ingestion Module
//!
//! Streams CSV inputs in micro-batches into the sink table:
//! - Batched CSV reading
//! - Per-row typing of price/user_id
//! - Per-row or per-batch commits
//! - Running statistics and progress reports

pub mod connector;
pub mod csv_connector;
pub mod pipeline;
pub mod row;

pub use connector::{ConnectorResult, RowSource};
pub use csv_connector::CsvConnector;
pub use pipeline::{FileIngestion, IngestionLoop, IngestionOptions, IngestionSummary};
pub use row::{PriceRow, RawRow};
