//! Pipeline configuration
//!
//! Static mapping of database path, target table, input files and batch size,
//! read from a JSON file and optionally overridden from the command line.

use crate::error::{IngestError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// When rows appended to the sink become durable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    /// Every row is committed on its own before the next one is read
    #[default]
    PerRow,

    /// One transaction per micro-batch; faster, but a crash loses the open batch
    PerBatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// SQLite database file
    pub db_path: PathBuf,

    /// Target table, created if absent
    pub table_name: String,

    /// CSV inputs, processed in order
    pub csv_files: Vec<PathBuf>,

    /// Rows read from a CSV file per micro-batch
    pub micro_batch_size: usize,

    #[serde(default)]
    pub commit_mode: CommitMode,
}

impl PipelineConfig {
    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            IngestError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: PipelineConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.micro_batch_size == 0 {
            return Err(IngestError::Config(
                "micro_batch_size must be a positive integer".to_string(),
            ));
        }

        if self.csv_files.is_empty() {
            return Err(IngestError::Config("csv_files must not be empty".to_string()));
        }

        if self.db_path.as_os_str().is_empty() {
            return Err(IngestError::Config("db_path must not be empty".to_string()));
        }

        validate_table_name(&self.table_name)
    }
}

/// The table name is spliced into SQL text, so only plain identifiers pass.
pub fn validate_table_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(IngestError::Config(format!(
            "table_name '{}' is not a valid identifier",
            name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PipelineConfig {
        PipelineConfig {
            db_path: PathBuf::from("prices.db"),
            table_name: "prices".to_string(),
            csv_files: vec![PathBuf::from("2024-01.csv")],
            micro_batch_size: 2,
            commit_mode: CommitMode::PerRow,
        }
    }

    #[test]
    fn test_parse_json_defaults_commit_mode() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{
                "db_path": "data/prices.db",
                "table_name": "prices",
                "csv_files": ["a.csv", "b.csv"],
                "micro_batch_size": 5
            }"#,
        )
        .unwrap();

        assert_eq!(config.commit_mode, CommitMode::PerRow);
        assert_eq!(config.csv_files.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_per_batch_mode() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{
                "db_path": "p.db",
                "table_name": "t",
                "csv_files": ["a.csv"],
                "micro_batch_size": 1,
                "commit_mode": "per_batch"
            }"#,
        )
        .unwrap();

        assert_eq!(config.commit_mode, CommitMode::PerBatch);
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let mut config = sample();
        config.micro_batch_size = 0;
        assert!(matches!(config.validate(), Err(IngestError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_file_list() {
        let mut config = sample();
        config.csv_files.clear();
        assert!(matches!(config.validate(), Err(IngestError::Config(_))));
    }

    #[test]
    fn test_table_name_identifiers() {
        assert!(validate_table_name("prices").is_ok());
        assert!(validate_table_name("_raw_2024").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("1prices").is_err());
        assert!(validate_table_name("prices; DROP TABLE x").is_err());
        assert!(validate_table_name("my-table").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = PipelineConfig::load("/nonexistent/pipeline.json").unwrap_err();
        assert!(err.to_string().contains("pipeline.json"));
    }
}
