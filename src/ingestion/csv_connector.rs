//! CSV Connector - Streams a CSV input in bounded micro-batches

use crate::error::{IngestError, Result};
use crate::ingestion::connector::{ConnectorResult, RowSource};
use crate::ingestion::RawRow;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Positions of the three modeled columns in the header
#[derive(Clone, Copy, Debug)]
struct ColumnIndex {
    timestamp: usize,
    price: usize,
    user_id: usize,
}

/// CSV Connector - reads at most `batch_size` records per fetch.
pub struct CsvConnector<R: Read> {
    source_id: String,
    reader: csv::Reader<R>,
    /// `None` when the input has no header line at all
    columns: Option<ColumnIndex>,
    batch_size: usize,
    record: StringRecord,
    exhausted: bool,
}

impl CsvConnector<File> {
    pub fn open(path: impl AsRef<Path>, batch_size: usize) -> Result<Self> {
        let path = path.as_ref();
        let source_id = path.display().to_string();
        let file = File::open(path).map_err(|e| IngestError::Read {
            path: source_id.clone(),
            source: csv::Error::from(e),
        })?;

        Self::from_reader(source_id, file, batch_size)
    }
}

impl<R: Read> CsvConnector<R> {
    pub fn from_reader(source_id: impl Into<String>, reader: R, batch_size: usize) -> Result<Self> {
        let source_id = source_id.into();
        if batch_size == 0 {
            return Err(IngestError::Config(
                "micro-batch size must be a positive integer".to_string(),
            ));
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::Headers)
            .from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|e| IngestError::Read {
                path: source_id.clone(),
                source: e,
            })?
            .clone();

        let columns = if headers.is_empty() {
            None
        } else {
            Some(ColumnIndex {
                timestamp: Self::locate(&source_id, &headers, "timestamp")?,
                price: Self::locate(&source_id, &headers, "price")?,
                user_id: Self::locate(&source_id, &headers, "user_id")?,
            })
        };

        Ok(Self {
            source_id,
            reader,
            columns,
            batch_size,
            record: StringRecord::new(),
            exhausted: false,
        })
    }

    fn locate(source_id: &str, headers: &StringRecord, column: &'static str) -> Result<usize> {
        headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| IngestError::MissingColumn {
                path: source_id.to_string(),
                column,
            })
    }

    fn cell(&self, idx: usize) -> String {
        self.record.get(idx).unwrap_or("").to_string()
    }
}

impl<R: Read> RowSource for CsvConnector<R> {
    fn fetch(&mut self) -> Result<ConnectorResult> {
        let Some(columns) = self.columns else {
            return Ok(ConnectorResult::done());
        };
        if self.exhausted {
            return Ok(ConnectorResult::done());
        }

        let mut rows = Vec::with_capacity(self.batch_size);
        while rows.len() < self.batch_size {
            let has_record = self
                .reader
                .read_record(&mut self.record)
                .map_err(|e| IngestError::Read {
                    path: self.source_id.clone(),
                    source: e,
                })?;

            if !has_record {
                self.exhausted = true;
                break;
            }

            rows.push(RawRow {
                line: self.record.position().map_or(0, |p| p.line()),
                timestamp: self.cell(columns.timestamp),
                price: self.cell(columns.price),
                user_id: self.cell(columns.user_id),
            });
        }

        Ok(ConnectorResult {
            rows,
            has_more: !self.exhausted,
        })
    }

    fn source_id(&self) -> &str {
        &self.source_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connector(text: &str, batch_size: usize) -> CsvConnector<&[u8]> {
        CsvConnector::from_reader("inline.csv", text.as_bytes(), batch_size).unwrap()
    }

    fn drain(conn: &mut CsvConnector<&[u8]>) -> Vec<Vec<RawRow>> {
        let mut batches = Vec::new();
        loop {
            let result = conn.fetch().unwrap();
            if !result.rows.is_empty() {
                batches.push(result.rows);
            }
            if !result.has_more {
                break;
            }
        }
        batches
    }

    #[test]
    fn test_batches_bounded_by_size() {
        let mut conn = connector(
            "timestamp,price,user_id\na,1,1\nb,2,2\nc,3,3\nd,4,4\ne,5,5\n",
            2,
        );
        let batches = drain(&mut conn);

        let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(batches[0][0].timestamp, "a");
        assert_eq!(batches[2][0].price, "5");
    }

    #[test]
    fn test_line_numbers_follow_source() {
        let mut conn = connector("timestamp,price,user_id\na,1,1\nb,2,2\n", 10);
        let rows = conn.fetch().unwrap().rows;

        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[1].line, 3);
    }

    #[test]
    fn test_columns_located_by_name() {
        let mut conn = connector("user_id, price ,extra,timestamp\n9,42,zz,2024-01-01\n", 5);
        let rows = conn.fetch().unwrap().rows;

        assert_eq!(rows[0].timestamp, "2024-01-01");
        assert_eq!(rows[0].price, "42");
        assert_eq!(rows[0].user_id, "9");
    }

    #[test]
    fn test_short_record_yields_blank_cells() {
        let mut conn = connector("timestamp,price,user_id\n2024-01-01,5\n", 5);
        let rows = conn.fetch().unwrap().rows;
        assert_eq!(rows[0].user_id, "");
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        let mut conn = connector("", 3);
        let result = conn.fetch().unwrap();
        assert!(result.rows.is_empty());
        assert!(!result.has_more);
    }

    #[test]
    fn test_header_only_input() {
        let mut conn = connector("timestamp,price,user_id\n", 3);
        assert!(drain(&mut conn).is_empty());
    }

    #[test]
    fn test_missing_column() {
        let err = CsvConnector::from_reader("bad.csv", "timestamp,cost\n1,2\n".as_bytes(), 1)
            .err()
            .unwrap();
        match err {
            IngestError::MissingColumn { path, column } => {
                assert_eq!(path, "bad.csv");
                assert_eq!(column, "price");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let result = CsvConnector::from_reader("x.csv", "timestamp,price,user_id\n".as_bytes(), 0);
        assert!(matches!(result, Err(IngestError::Config(_))));
    }

    #[test]
    fn test_open_missing_file_names_path() {
        let err = CsvConnector::open("/nonexistent/prices.csv", 2).err().unwrap();
        assert!(err.to_string().contains("/nonexistent/prices.csv"));
    }
}
