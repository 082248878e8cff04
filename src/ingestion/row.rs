//! Row model - raw CSV cells and their typed form

use crate::error::FieldError;
use serde::{Deserialize, Serialize};

/// Cell values treated as missing, in addition to blank cells
const NULL_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// One CSV record, cells untouched
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line in the source where the record starts
    pub line: u64,
    pub timestamp: String,
    pub price: String,
    pub user_id: String,
}

/// A record ready to be appended to the sink
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRow {
    /// Stored verbatim; `None` only when the cell is missing
    pub timestamp: Option<String>,
    pub price: Option<i64>,
    pub user_id: Option<i64>,
}

impl PriceRow {
    pub fn parse(raw: &RawRow) -> Result<Self, FieldError> {
        let timestamp = if is_null_cell(&raw.timestamp) {
            None
        } else {
            Some(raw.timestamp.clone())
        };

        Ok(Self {
            timestamp,
            price: parse_int_cell("price", &raw.price)?,
            user_id: parse_int_cell("user_id", &raw.user_id)?,
        })
    }
}

fn is_null_cell(cell: &str) -> bool {
    let trimmed = cell.trim();
    trimmed.is_empty() || NULL_MARKERS.contains(&trimmed)
}

/// Integer or absent. Decimals are truncated toward zero ("10.5" is 10);
/// only text that is not a finite number is an error.
fn parse_int_cell(column: &'static str, cell: &str) -> Result<Option<i64>, FieldError> {
    if is_null_cell(cell) {
        return Ok(None);
    }

    let trimmed = cell.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Ok(Some(i));
    }

    if let Ok(f) = trimmed.parse::<f64>() {
        let truncated = f.trunc();
        if f.is_finite() && truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
            return Ok(Some(truncated as i64));
        }
    }

    Err(FieldError::NotAnInteger {
        column,
        value: cell.to_string(),
    })
}
