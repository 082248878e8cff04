//! Ingestion Loop - loads rows into the sink and drives the accumulator
//!
//! For every micro-batch fetched from a source, each row is parsed, appended
//! to the sink and fed to the accumulator, strictly in source order. A
//! progress report follows each batch. Any parse or write failure aborts the
//! current source; rows already appended stay committed.

use crate::config::{CommitMode, PipelineConfig};
use crate::db::RowSink;
use crate::error::{IngestError, Result};
use crate::ingestion::connector::RowSource;
use crate::ingestion::csv_connector::CsvConnector;
use crate::ingestion::{PriceRow, RawRow};
use crate::report::ProgressReporter;
use crate::stats::{StatisticsAccumulator, StatsSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionOptions {
    pub batch_size: usize,
    pub commit_mode: CommitMode,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            commit_mode: CommitMode::PerRow,
        }
    }
}

impl From<&PipelineConfig> for IngestionOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            batch_size: config.micro_batch_size,
            commit_mode: config.commit_mode,
        }
    }
}

/// Outcome of loading one source
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIngestion {
    pub source: String,
    pub rows_ingested: u64,
    pub batches: u64,
}

/// Outcome of a multi-file run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestionSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub files: Vec<FileIngestion>,

    /// Accumulator state after the last file
    pub statistics: StatsSnapshot,
}

impl IngestionSummary {
    pub fn rows_ingested(&self) -> u64 {
        self.files.iter().map(|f| f.rows_ingested).sum()
    }
}

pub struct IngestionLoop<'a, S: RowSink + ?Sized> {
    sink: &'a mut S,
    options: IngestionOptions,
    reporter: ProgressReporter<'a>,
}

impl<'a, S: RowSink + ?Sized> IngestionLoop<'a, S> {
    pub fn new(sink: &'a mut S, options: IngestionOptions) -> Self {
        Self {
            sink,
            options,
            reporter: ProgressReporter::silent(),
        }
    }

    pub fn with_reporter(mut self, reporter: ProgressReporter<'a>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Load every file in order into the same sink, sharing one accumulator.
    /// Stops at the first file that fails.
    pub fn run_files<P: AsRef<Path>>(
        &mut self,
        paths: &[P],
        accumulator: &mut StatisticsAccumulator,
    ) -> Result<IngestionSummary> {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        info!("Ingestion run {} started with {} file(s)", run_id, paths.len());

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            files.push(self.run_file(path.as_ref(), accumulator)?);
        }

        let summary = IngestionSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            files,
            statistics: accumulator.snapshot(),
        };
        info!(
            "Ingestion run {} finished: {} row(s) loaded",
            summary.run_id,
            summary.rows_ingested()
        );

        Ok(summary)
    }

    pub fn run_file(
        &mut self,
        path: &Path,
        accumulator: &mut StatisticsAccumulator,
    ) -> Result<FileIngestion> {
        let mut connector = CsvConnector::open(path, self.options.batch_size)?;
        self.run_source(&mut connector, accumulator)
    }

    pub fn run_source(
        &mut self,
        source: &mut dyn RowSource,
        accumulator: &mut StatisticsAccumulator,
    ) -> Result<FileIngestion> {
        let source_id = source.source_id().to_string();
        info!("Loading {} into table {}", source_id, self.sink.table_name());

        let mut outcome = FileIngestion {
            source: source_id.clone(),
            rows_ingested: 0,
            batches: 0,
        };

        let mut has_more = true;
        while has_more {
            let result = source.fetch()?;
            has_more = result.has_more;

            if result.rows.is_empty() {
                continue;
            }

            let loaded = self.load_batch(&source_id, &result.rows, accumulator)?;
            outcome.rows_ingested += loaded;
            outcome.batches += 1;
            debug!(
                "Batch {} from {}: {} row(s)",
                outcome.batches, source_id, loaded
            );

            self.reporter.report(&accumulator.snapshot());
        }

        info!(
            "Finished {}: {} row(s) in {} batch(es)",
            source_id, outcome.rows_ingested, outcome.batches
        );
        Ok(outcome)
    }

    fn load_batch(
        &mut self,
        source_id: &str,
        rows: &[RawRow],
        accumulator: &mut StatisticsAccumulator,
    ) -> Result<u64> {
        let per_batch = self.options.commit_mode == CommitMode::PerBatch;
        let first_line = rows.first().map_or(0, |r| r.line);
        let last_line = rows.last().map_or(0, |r| r.line);

        if per_batch {
            self.sink
                .begin_batch()
                .map_err(|e| IngestError::SinkWrite {
                    path: source_id.to_string(),
                    line: first_line,
                    source: e,
                })?;
        }

        let mut loaded = 0;
        let mut outcome = Ok(());
        for raw in rows {
            if let Err(e) = self.load_row(source_id, raw, accumulator) {
                outcome = Err(e);
                break;
            }
            loaded += 1;
        }

        // Rows appended before a failure are committed, never rolled back.
        if per_batch {
            if let Err(e) = self.sink.commit_batch() {
                match outcome {
                    Ok(()) => {
                        return Err(IngestError::SinkWrite {
                            path: source_id.to_string(),
                            line: last_line,
                            source: e,
                        })
                    }
                    Err(_) => warn!("Failed to commit partial batch from {}: {}", source_id, e),
                }
            }
        }

        outcome.map(|()| loaded)
    }

    fn load_row(
        &mut self,
        source_id: &str,
        raw: &RawRow,
        accumulator: &mut StatisticsAccumulator,
    ) -> Result<()> {
        let row = PriceRow::parse(raw).map_err(|e| IngestError::Parse {
            path: source_id.to_string(),
            line: raw.line,
            source: e,
        })?;

        self.sink
            .append(&row)
            .map_err(|e| IngestError::SinkWrite {
                path: source_id.to_string(),
                line: raw.line,
                source: e,
            })?;

        accumulator.record(row.price);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteSink;
    use crate::ingestion::ConnectorResult;

    /// Source that hands out prepared batches
    struct ScriptedSource {
        batches: Vec<Vec<RawRow>>,
    }

    impl RowSource for ScriptedSource {
        fn fetch(&mut self) -> Result<ConnectorResult> {
            if self.batches.is_empty() {
                return Ok(ConnectorResult::done());
            }
            let rows = self.batches.remove(0);
            Ok(ConnectorResult {
                rows,
                has_more: !self.batches.is_empty(),
            })
        }

        fn source_id(&self) -> &str {
            "scripted"
        }
    }

    fn raw(line: u64, price: &str) -> RawRow {
        RawRow {
            line,
            timestamp: "2024-01-01".to_string(),
            price: price.to_string(),
            user_id: line.to_string(),
        }
    }

    #[test]
    fn test_one_report_per_batch() {
        let mut sink = SqliteSink::in_memory("prices").unwrap();
        let mut acc = StatisticsAccumulator::new();
        let mut out = Vec::new();
        let mut source = ScriptedSource {
            batches: vec![vec![raw(2, "1"), raw(3, "")], vec![raw(4, "3")]],
        };

        let outcome = IngestionLoop::new(&mut sink, IngestionOptions::default())
            .with_reporter(ProgressReporter::new(&mut out))
            .run_source(&mut source, &mut acc)
            .unwrap();

        assert_eq!(outcome.rows_ingested, 3);
        assert_eq!(outcome.batches, 2);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("Total rows:").count(), 2);
        assert!(text.contains("Total rows: 3\nMean price: 2.00"));
    }

    #[test]
    fn test_no_report_before_first_valid_row() {
        let mut sink = SqliteSink::in_memory("prices").unwrap();
        let mut acc = StatisticsAccumulator::new();
        let mut out = Vec::new();
        let mut source = ScriptedSource {
            batches: vec![vec![raw(2, "")], vec![raw(3, "5")]],
        };

        IngestionLoop::new(&mut sink, IngestionOptions::default())
            .with_reporter(ProgressReporter::new(&mut out))
            .run_source(&mut source, &mut acc)
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("Total rows:").count(), 1);
        assert!(text.contains("Total rows: 2"));
    }

    #[test]
    fn test_parse_error_carries_line() {
        let mut sink = SqliteSink::in_memory("prices").unwrap();
        let mut acc = StatisticsAccumulator::new();
        let mut source = ScriptedSource {
            batches: vec![vec![raw(2, "4"), raw(3, "oops"), raw(4, "6")]],
        };

        let err = IngestionLoop::new(&mut sink, IngestionOptions::default())
            .run_source(&mut source, &mut acc)
            .unwrap_err();

        match err {
            IngestError::Parse { path, line, .. } => {
                assert_eq!(path, "scripted");
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(acc.total_rows(), 1);
        assert_eq!(sink.row_count().unwrap(), 1);
    }

    #[test]
    fn test_per_batch_commits_rows_before_failure() {
        let mut sink = SqliteSink::in_memory("prices").unwrap();
        let mut acc = StatisticsAccumulator::new();
        let options = IngestionOptions {
            batch_size: 3,
            commit_mode: CommitMode::PerBatch,
        };
        let mut source = ScriptedSource {
            batches: vec![
                vec![raw(2, "1"), raw(3, "2"), raw(4, "3")],
                vec![raw(5, "4"), raw(6, "x")],
            ],
        };

        let result = IngestionLoop::new(&mut sink, options).run_source(&mut source, &mut acc);

        assert!(matches!(result, Err(IngestError::Parse { line: 6, .. })));
        assert_eq!(sink.row_count().unwrap(), 4);
        assert_eq!(acc.total_rows(), 4);
    }
}
