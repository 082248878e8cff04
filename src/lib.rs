pub mod config;
pub mod db;
pub mod error;
pub mod ingestion;
pub mod query;
pub mod report;
pub mod stats;

pub use config::{CommitMode, PipelineConfig};
pub use db::{RowSink, SqliteSink};
pub use error::{IngestError, Result};
pub use ingestion::{IngestionLoop, IngestionOptions, IngestionSummary};
pub use query::{QueryStatistics, StatisticsQuery};
pub use report::ProgressReporter;
pub use stats::{StatisticsAccumulator, StatsSnapshot};
