//! Sink module for the relational table that receives ingested rows
//!
//! The ingestion loop only sees the [`RowSink`] trait; [`SqliteSink`] is the
//! SQLite-backed implementation used by the binary and the statistics query.

pub mod sink;

pub use sink::SqliteSink;

use crate::error::SinkError;
use crate::ingestion::PriceRow;

/// Append-only destination for parsed rows.
///
/// Implementations:
/// - SqliteSink: SQLite table, one connection for the whole run
pub trait RowSink {
    /// Append one row. In per-row mode the row must be durable on return.
    fn append(&mut self, row: &PriceRow) -> Result<(), SinkError>;

    /// Open a unit of work spanning one micro-batch (per-batch commit mode only)
    fn begin_batch(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Commit everything appended since `begin_batch`
    fn commit_batch(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn table_name(&self) -> &str;
}
