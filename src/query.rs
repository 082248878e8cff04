//! Statistics recomputed from the persisted table
//!
//! Independent of the in-memory accumulator; used after ingestion as a
//! cross-check. Absent aggregates stay `None` here, the same representation
//! the accumulator uses, and only the rendered report falls back to `0.00`.

use crate::error::{IngestError, Result};
use crate::stats::StatsSnapshot;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

const MEAN_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryStatistics {
    pub total_rows: u64,
    pub total_valid_rows: u64,
    pub mean_price: Option<f64>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
}

pub struct StatisticsQuery<'a> {
    conn: &'a Connection,
    table_name: &'a str,
}

impl<'a> StatisticsQuery<'a> {
    pub fn new(conn: &'a Connection, table_name: &'a str) -> Self {
        Self { conn, table_name }
    }

    pub fn run(&self) -> Result<QueryStatistics> {
        let sql = format!(
            "SELECT COUNT(*), COUNT(price), AVG(price), MIN(price), MAX(price) FROM \"{}\"",
            self.table_name
        );

        self.conn
            .query_row(&sql, [], |row| {
                let total_rows: i64 = row.get(0)?;
                let total_valid_rows: i64 = row.get(1)?;
                Ok(QueryStatistics {
                    total_rows: total_rows as u64,
                    total_valid_rows: total_valid_rows as u64,
                    mean_price: row.get(2)?,
                    min_price: row.get(3)?,
                    max_price: row.get(4)?,
                })
            })
            .map_err(|e| IngestError::SinkQuery {
                table: self.table_name.to_string(),
                source: e,
            })
    }
}

impl QueryStatistics {
    pub fn mean_price_or_zero(&self) -> f64 {
        self.mean_price.unwrap_or(0.0)
    }

    pub fn min_price_or_zero(&self) -> f64 {
        self.min_price.map_or(0.0, |p| p as f64)
    }

    pub fn max_price_or_zero(&self) -> f64 {
        self.max_price.map_or(0.0, |p| p as f64)
    }

    /// Final report block. Missing aggregates print as `0.00`.
    pub fn render(&self) -> String {
        format!(
            "Total rows: {}\nMean price: {:.2}\nMin price: {:.2}\nMax price: {:.2}",
            self.total_rows,
            self.mean_price_or_zero(),
            self.min_price_or_zero(),
            self.max_price_or_zero()
        )
    }

    /// True when the persisted aggregates match an accumulator snapshot.
    /// Only meaningful if the table was empty before the run.
    pub fn agrees_with(&self, snapshot: &StatsSnapshot) -> bool {
        let means_agree = match (self.mean_price, snapshot.mean_price) {
            (Some(a), Some(b)) => (a - b).abs() < MEAN_TOLERANCE,
            (None, None) => true,
            _ => false,
        };

        self.total_rows == snapshot.total_rows
            && self.total_valid_rows == snapshot.total_valid_rows
            && self.min_price == snapshot.min_price
            && self.max_price == snapshot.max_price
            && means_agree
    }
}
