use thiserror::Error;

/// A single cell that could not be turned into a typed field.
#[derive(Error, Debug)]
pub enum FieldError {
    #[error("column '{column}' has non-integer value '{value}'")]
    NotAnInteger { column: &'static str, value: String },
}

/// Failure raised by a [`RowSink`](crate::db::RowSink).
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Row rejected: {0}")]
    Rejected(String),
}

/// Failure while writing a progress report. Never aborts ingestion.
#[derive(Error, Debug)]
pub enum ReportingError {
    #[error("Failed to write progress report: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Error processing CSV file '{path}' at line {line}: {source}")]
    Parse {
        path: String,
        line: u64,
        #[source]
        source: FieldError,
    },

    #[error("Error reading CSV file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("CSV file '{path}' is missing required column '{column}'")]
    MissingColumn { path: String, column: &'static str },

    #[error("Error writing row from CSV file '{path}' at line {line}: {source}")]
    SinkWrite {
        path: String,
        line: u64,
        #[source]
        source: SinkError,
    },

    #[error("Error querying statistics in table '{table}': {source}")]
    SinkQuery {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Failed to open sink '{target}': {source}")]
    SinkOpen {
        target: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IngestError>;
