//! Accepted spreadsheet headers for each canonical field.
//!
//! Matching is exact after trimming. The `city_namte` entry is a misspelling
//! that circulated in real templates.

use super::{CellValue, SheetRow};

pub struct FieldHeaders {
    pub field: &'static str,
    pub headers: &'static [&'static str],
}

pub const EMPLOYEE_ID: FieldHeaders = FieldHeaders {
    field: "employee_id",
    headers: &["employee_id", "工号"],
};
pub const EMPLOYEE_NAME: FieldHeaders = FieldHeaders {
    field: "employee_name",
    headers: &["employee_name", "姓名"],
};
pub const MONTH: FieldHeaders = FieldHeaders {
    field: "month",
    headers: &["month", "年份月份"],
};
pub const SALARY_AMOUNT: FieldHeaders = FieldHeaders {
    field: "salary_amount",
    headers: &["salary_amount", "工资金额"],
};

pub const CITY_NAME: FieldHeaders = FieldHeaders {
    field: "city_name",
    headers: &["city_name", "city_namte", "城市名"],
};
pub const YEAR: FieldHeaders = FieldHeaders {
    field: "year",
    headers: &["year", "年份"],
};
pub const BASE_MIN: FieldHeaders = FieldHeaders {
    field: "base_min",
    headers: &["base_min", "基数下限"],
};
pub const BASE_MAX: FieldHeaders = FieldHeaders {
    field: "base_max",
    headers: &["base_max", "基数上限"],
};
pub const RATE: FieldHeaders = FieldHeaders {
    field: "rate",
    headers: &["rate", "综合比例"],
};

pub const SALARY_FIELDS: [&FieldHeaders; 4] = [&EMPLOYEE_ID, &EMPLOYEE_NAME, &MONTH, &SALARY_AMOUNT];
pub const CITY_FIELDS: [&FieldHeaders; 5] = [&CITY_NAME, &YEAR, &BASE_MIN, &BASE_MAX, &RATE];

impl FieldHeaders {
    /// First non-empty cell among the accepted headers.
    pub fn lookup<'r>(&self, row: &'r SheetRow) -> Option<&'r CellValue> {
        self.headers
            .iter()
            .filter_map(|h| row.cells.get(*h))
            .find(|v| **v != CellValue::Empty)
    }

    pub fn text(&self, row: &SheetRow) -> String {
        self.lookup(row).map(CellValue::as_text).unwrap_or_default()
    }

    pub fn accepts(&self, header: &str) -> bool {
        self.headers.contains(&header.trim())
    }
}

/// Canonical fields with no matching column among `headers`.
pub fn missing_fields(fields: &[&FieldHeaders], headers: &[String]) -> Vec<&'static str> {
    fields
        .iter()
        .filter(|f| !headers.iter().any(|h| f.accepts(h)))
        .map(|f| f.field)
        .collect()
}
