use super::headers::{BASE_MAX, BASE_MIN, CITY_NAME, RATE, YEAR};
use super::{Parsed, SheetRow};
use crate::model::city_standard::CityStandard;

/// Validates city-standard rows: floor, ceiling and rate must be positive
/// and the floor may not exceed the ceiling.
pub fn parse_city_rows(rows: &[SheetRow]) -> Parsed<CityStandard> {
    let mut data = Vec::with_capacity(rows.len());
    let mut errors = Vec::new();

    for row in rows {
        match parse_row(row) {
            Ok(standard) => data.push(standard),
            Err(msg) => errors.push(format!("row {}: {}", row.line, msg)),
        }
    }

    Parsed { data, errors }
}

fn parse_row(row: &SheetRow) -> Result<CityStandard, String> {
    let city_name = CITY_NAME.text(row);
    let year = YEAR.text(row);

    if city_name.is_empty() || year.is_empty() {
        return Err("missing city name or year".into());
    }

    let number = |field: &super::headers::FieldHeaders| -> Result<f64, String> {
        match field.lookup(row).map(|v| v.as_number()) {
            Some(Ok(Some(n))) if n > 0.0 => Ok(n),
            Some(Err(raw)) => Err(format!("{} '{}' is not a number", field.field, raw)),
            _ => Err("base_min, base_max and rate must be greater than 0".into()),
        }
    };

    let base_min = number(&BASE_MIN)?;
    let base_max = number(&BASE_MAX)?;
    let rate = number(&RATE)?;

    if base_min > base_max {
        return Err(format!(
            "base_min {} is greater than base_max {}",
            base_min, base_max
        ));
    }

    Ok(CityStandard {
        city_name,
        year,
        base_min,
        base_max,
        rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::CellValue;

    fn row(line: usize, cells: &[(&str, CellValue)]) -> SheetRow {
        SheetRow {
            line,
            cells: cells
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    fn city_row(line: usize, name: &str, min: f64, max: f64, rate: f64) -> SheetRow {
        row(
            line,
            &[
                ("city_namte", CellValue::Text(name.into())),
                ("year", CellValue::Number(2024.0)),
                ("基数下限", CellValue::Number(min)),
                ("基数上限", CellValue::Number(max)),
                ("综合比例", CellValue::Number(rate)),
            ],
        )
    }

    #[test]
    fn parses_mixed_header_variants() {
        let parsed = parse_city_rows(&[city_row(2, "佛山", 4546.0, 26421.0, 0.15)]);

        assert!(parsed.errors.is_empty());
        assert_eq!(
            parsed.data,
            vec![CityStandard {
                city_name: "佛山".into(),
                year: "2024".into(),
                base_min: 4546.0,
                base_max: 26421.0,
                rate: 0.15,
            }]
        );
    }

    #[test]
    fn rejects_non_positive_and_inverted_bounds() {
        let parsed = parse_city_rows(&[
            city_row(2, "A", 0.0, 100.0, 0.1),
            city_row(3, "B", 100.0, 50.0, 0.1),
            city_row(4, "C", 100.0, 200.0, 0.1),
            row(5, &[("city_name", CellValue::Text("D".into()))]),
        ]);

        assert_eq!(parsed.data.len(), 1);
        assert_eq!(parsed.data[0].city_name, "C");
        assert_eq!(
            parsed.errors,
            vec![
                "row 2: base_min, base_max and rate must be greater than 0",
                "row 3: base_min 100 is greater than base_max 50",
                "row 5: missing city name or year",
            ]
        );
    }

    #[test]
    fn rejects_text_in_numeric_columns() {
        let parsed = parse_city_rows(&[row(
            7,
            &[
                ("city_name", CellValue::Text("Foshan".into())),
                ("year", CellValue::Text("2024".into())),
                ("base_min", CellValue::Text("low".into())),
                ("base_max", CellValue::Number(100.0)),
                ("rate", CellValue::Number(0.1)),
            ],
        )]);

        assert_eq!(parsed.errors, vec!["row 7: base_min 'low' is not a number"]);
    }
}
