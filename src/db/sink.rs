//! SQLite sink
//!
//! Owns the single connection used by both the ingestion and the query phase.
//! The table is created once if absent and is never dropped or altered.

use crate::config::validate_table_name;
use crate::db::RowSink;
use crate::error::{IngestError, Result, SinkError};
use crate::ingestion::PriceRow;
use crate::query::{QueryStatistics, StatisticsQuery};
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::{debug, info, warn};

pub struct SqliteSink {
    conn: Connection,
    table_name: String,
    insert_sql: String,
    in_batch: bool,
}

impl SqliteSink {
    /// Open (or create) the database file and make sure the table exists
    pub fn open(db_path: impl AsRef<Path>, table_name: &str) -> Result<Self> {
        validate_table_name(table_name)?;
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path).map_err(|e| IngestError::SinkOpen {
            target: db_path.display().to_string(),
            source: e,
        })?;

        info!("Opened sink database {}", db_path.display());
        Self::from_connection(conn, table_name)
    }

    /// Private in-memory database, mostly useful for tests
    pub fn in_memory(table_name: &str) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| IngestError::SinkOpen {
            target: ":memory:".to_string(),
            source: e,
        })?;
        Self::from_connection(conn, table_name)
    }

    pub fn from_connection(conn: Connection, table_name: &str) -> Result<Self> {
        validate_table_name(table_name)?;

        let sink = Self {
            insert_sql: format!(
                "INSERT INTO \"{}\" (timestamp, price, user_id) VALUES (?1, ?2, ?3)",
                table_name
            ),
            conn,
            table_name: table_name.to_string(),
            in_batch: false,
        };

        sink.ensure_table()?;
        Ok(sink)
    }

    fn ensure_table(&self) -> Result<()> {
        self.conn
            .execute(
                &format!(
                    r#"
                    CREATE TABLE IF NOT EXISTS "{}" (
                        timestamp DATETIME,
                        price INTEGER,
                        user_id INTEGER
                    )
                    "#,
                    self.table_name
                ),
                [],
            )
            .map_err(|e| IngestError::SinkOpen {
                target: self.table_name.clone(),
                source: e,
            })?;

        debug!("Ensured table {} exists", self.table_name);
        Ok(())
    }

    /// Number of rows currently persisted in the table
    pub fn row_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row(
                &format!("SELECT COUNT(*) FROM \"{}\"", self.table_name),
                [],
                |row| row.get(0),
            )
            .map_err(|e| IngestError::SinkQuery {
                table: self.table_name.clone(),
                source: e,
            })?;

        Ok(count as u64)
    }

    /// Aggregate statistics recomputed from the persisted rows
    pub fn query_statistics(&self) -> Result<QueryStatistics> {
        StatisticsQuery::new(&self.conn, &self.table_name).run()
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl RowSink for SqliteSink {
    fn append(&mut self, row: &PriceRow) -> std::result::Result<(), SinkError> {
        let mut stmt = self.conn.prepare_cached(&self.insert_sql)?;
        stmt.execute(params![row.timestamp, row.price, row.user_id])?;
        Ok(())
    }

    fn begin_batch(&mut self) -> std::result::Result<(), SinkError> {
        if !self.in_batch {
            self.conn.execute_batch("BEGIN")?;
            self.in_batch = true;
        }
        Ok(())
    }

    fn commit_batch(&mut self) -> std::result::Result<(), SinkError> {
        if !self.in_batch {
            return Ok(());
        }
        self.in_batch = false;

        if let Err(e) = self.conn.execute_batch("COMMIT") {
            // A failed COMMIT can leave the transaction open; close it so the
            // next batch starts clean.
            if !self.conn.is_autocommit() {
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                    warn!("Failed to roll back batch in {}: {}", self.table_name, rollback);
                }
            }
            return Err(e.into());
        }

        Ok(())
    }

    fn table_name(&self) -> &str {
        &self.table_name
    }
}
