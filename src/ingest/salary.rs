use super::headers::{EMPLOYEE_ID, EMPLOYEE_NAME, MONTH, SALARY_AMOUNT};
use super::{Parsed, SheetRow};
use crate::model::salary::SalaryLineItem;

/// Validates salary rows. A missing amount counts as zero.
pub fn parse_salary_rows(rows: &[SheetRow]) -> Parsed<SalaryLineItem> {
    let mut data = Vec::with_capacity(rows.len());
    let mut errors = Vec::new();

    for row in rows {
        match parse_row(row) {
            Ok(item) => data.push(item),
            Err(msg) => errors.push(format!("row {}: {}", row.line, msg)),
        }
    }

    Parsed { data, errors }
}

fn parse_row(row: &SheetRow) -> Result<SalaryLineItem, String> {
    let employee_id = EMPLOYEE_ID.text(row);
    let employee_name = EMPLOYEE_NAME.text(row);
    let month = MONTH.text(row);

    if employee_id.is_empty() || employee_name.is_empty() || month.is_empty() {
        return Err("missing employee id, name or month".into());
    }

    let salary_amount = match SALARY_AMOUNT.lookup(row).map(|v| v.as_number()) {
        None | Some(Ok(None)) => 0.0,
        Some(Ok(Some(amount))) => amount,
        Some(Err(raw)) => return Err(format!("salary amount '{}' is not a number", raw)),
    };

    if salary_amount < 0.0 {
        return Err("salary amount must not be negative".into());
    }

    Ok(SalaryLineItem {
        employee_id,
        employee_name,
        month,
        salary_amount,
    })
}
