//! Streaming price statistics
//!
//! Running totals kept while rows are loaded. The accumulator is owned by the
//! caller and handed to the ingestion loop explicitly, so a single value can be
//! shared across several files and inspected independently in tests.

use serde::{Deserialize, Serialize};

/// Running totals over the `price` column of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatisticsAccumulator {
    total_rows: u64,
    total_valid_rows: u64,
    min_price: Option<i64>,
    max_price: Option<i64>,
    sum_price: i64,
}

/// Point-in-time view of a [`StatisticsAccumulator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Every row seen, including rows without a price
    pub total_rows: u64,

    /// Rows whose price was present
    pub total_valid_rows: u64,

    pub min_price: Option<i64>,
    pub max_price: Option<i64>,

    /// `None` until the first valid row arrives
    pub mean_price: Option<f64>,
}

impl StatisticsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one row. Only a present price contributes to sum and extrema.
    pub fn record(&mut self, price: Option<i64>) {
        self.total_rows += 1;

        if let Some(price) = price {
            self.total_valid_rows += 1;
            self.min_price = Some(self.min_price.map_or(price, |m| m.min(price)));
            self.max_price = Some(self.max_price.map_or(price, |m| m.max(price)));
            self.sum_price += price;
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let mean_price = if self.total_valid_rows > 0 {
            Some(self.sum_price as f64 / self.total_valid_rows as f64)
        } else {
            None
        };

        StatsSnapshot {
            total_rows: self.total_rows,
            total_valid_rows: self.total_valid_rows,
            min_price: self.min_price,
            max_price: self.max_price,
            mean_price,
        }
    }

    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    pub fn total_valid_rows(&self) -> u64 {
        self.total_valid_rows
    }

    pub fn sum_price(&self) -> i64 {
        self.sum_price
    }
}

impl StatsSnapshot {
    /// Progress block printed after a micro-batch.
    ///
    /// Returns `None` while no valid row has been seen; callers skip printing
    /// in that case.
    pub fn render(&self) -> Option<String> {
        let mean = self.mean_price?;
        let min = self.min_price?;
        let max = self.max_price?;

        Some(format!(
            "Total rows: {}\nMean price: {:.2}\nMin price: {:.2}\nMax price: {:.2}",
            self.total_rows, mean, min as f64, max as f64
        ))
    }
}
