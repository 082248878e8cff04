//! Row Source Trait - Abstract interface for batched inputs

use crate::error::Result;
use crate::ingestion::RawRow;

/// Result from a source fetch
#[derive(Clone, Debug)]
pub struct ConnectorResult {
    /// Rows of this micro-batch, in source order
    pub rows: Vec<RawRow>,

    /// False once the source is exhausted
    pub has_more: bool,
}

impl ConnectorResult {
    pub fn done() -> Self {
        Self {
            rows: Vec::new(),
            has_more: false,
        }
    }
}

/// Source of raw rows, read one micro-batch at a time
///
/// Implementations:
/// - CsvConnector: CSV file or any `io::Read`
pub trait RowSource {
    /// Fetch the next micro-batch
    fn fetch(&mut self) -> Result<ConnectorResult>;

    /// Name used in error messages (usually the file path)
    fn source_id(&self) -> &str;
}
