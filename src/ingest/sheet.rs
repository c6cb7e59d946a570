use calamine::{Data, Reader, open_workbook_auto_from_rs};
use std::collections::HashMap;
use std::io::Cursor;

use super::{CellValue, IngestError, SheetRow};

/// Reads the first worksheet of an `.xlsx` / `.xls` workbook. Returns the
/// trimmed header row and every non-blank data row below it.
pub fn read_first_sheet(bytes: Vec<u8>) -> Result<(Vec<String>, Vec<SheetRow>), IngestError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(IngestError::NoWorksheet)??;

    let first_line = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);
    let mut rows = range.rows();

    let headers: Vec<String> = rows
        .next()
        .ok_or(IngestError::NoHeader)?
        .iter()
        .map(|cell| cell_value(cell).as_text())
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(IngestError::NoHeader);
    }

    let data = collect_rows(&headers, rows, first_line + 1);
    Ok((headers, data))
}

fn collect_rows<'a>(
    headers: &[String],
    rows: impl Iterator<Item = &'a [Data]>,
    first_line: usize,
) -> Vec<SheetRow> {
    rows.enumerate()
        .filter_map(|(i, cells)| {
            let cells: HashMap<String, CellValue> = headers
                .iter()
                .zip(cells)
                .filter(|(header, _)| !header.is_empty())
                .map(|(header, cell)| (header.clone(), cell_value(cell)))
                .filter(|(_, value)| *value != CellValue::Empty)
                .collect();

            (!cells.is_empty()).then(|| SheetRow {
                line: first_line + i,
                cells,
            })
        })
        .collect()
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.trim().is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        other => CellValue::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bytes_that_are_not_a_workbook() {
        let err = read_first_sheet(b"employee_id,employee_name\nE1,Alice\n".to_vec()).unwrap_err();
        assert!(matches!(err, IngestError::Workbook(_)));
    }

    #[test]
    fn keys_cells_by_header_and_skips_blank_rows() {
        let headers = vec!["工号".to_string(), String::new(), "salary_amount".to_string()];
        let data = vec![
            vec![Data::String("E1".into()), Data::String("ignored".into()), Data::Float(5000.0)],
            vec![Data::Empty, Data::Empty, Data::String("  ".into())],
            vec![Data::String("E2".into()), Data::Empty, Data::Int(7000)],
        ];

        let rows = collect_rows(&headers, data.iter().map(Vec::as_slice), 2);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[0].cells.len(), 2);
        assert_eq!(rows[0].cells["salary_amount"], CellValue::Number(5000.0));
        assert_eq!(rows[1].line, 4);
        assert_eq!(rows[1].cells["工号"], CellValue::Text("E2".into()));
    }
}
