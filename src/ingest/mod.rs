//! Spreadsheet ingestion for the upload endpoints.
//!
//! A workbook's first sheet is read into header-keyed rows, header variants
//! are mapped onto canonical field names through the tables in [`headers`],
//! and each row is validated into a model value or a row-numbered error.

pub mod city;
pub mod headers;
pub mod salary;
pub mod sheet;

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unreadable workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("workbook has no worksheets")]
    NoWorksheet,

    #[error("first worksheet has no header row")]
    NoHeader,
}

/// A cell reduced to what the parsers care about.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Empty,
}

impl CellValue {
    /// Text form of the cell; integral numbers lose their fraction so that
    /// a month typed as `202401` reads back as `"202401"`.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            CellValue::Number(n) => n.to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Empty => String::new(),
        }
    }

    /// `Ok(None)` for empty cells; `Err` carries the text of a cell that
    /// is not a number.
    pub fn as_number(&self) -> Result<Option<f64>, String> {
        match self {
            CellValue::Number(n) => Ok(Some(*n)),
            CellValue::Text(s) if s.trim().is_empty() => Ok(None),
            CellValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Some)
                .ok_or_else(|| s.trim().to_string()),
            CellValue::Bool(b) => Err(b.to_string()),
            CellValue::Empty => Ok(None),
        }
    }
}

/// One data row of a sheet, keyed by trimmed header text.
#[derive(Debug, Clone, Default)]
pub struct SheetRow {
    /// 1-based row number as shown by spreadsheet software.
    pub line: usize,
    pub cells: HashMap<String, CellValue>,
}

/// Valid rows plus one message per rejected row.
#[derive(Debug)]
pub struct Parsed<T> {
    pub data: Vec<T>,
    pub errors: Vec<String>,
}

/// Drops rows whose key is already stored or appeared earlier in the same
/// upload. Returns the kept rows and a label for each skipped one.
pub fn dedup<T, K>(
    rows: Vec<T>,
    mut seen: HashSet<K>,
    key: impl Fn(&T) -> K,
    label: impl Fn(&T) -> String,
) -> (Vec<T>, Vec<String>)
where
    K: Eq + Hash,
{
    let mut kept = Vec::with_capacity(rows.len());
    let mut skipped = Vec::new();

    for row in rows {
        if seen.insert(key(&row)) {
            kept.push(row);
        } else {
            skipped.push(label(&row));
        }
    }

    (kept, skipped)
}
