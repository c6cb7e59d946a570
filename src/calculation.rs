//! Contribution calculator.
//!
//! Salary rows are grouped by employee name and averaged, the average is
//! clamped into the selected city standard's `[base_min, base_max]` and the
//! company fee is `base * rate`. All three figures are rounded to two
//! decimals when the output row is built.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use strum::IntoStaticStr;
use thiserror::Error;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::model::city_standard::CityStandard;
use crate::model::contribution::ContributionResult;
use crate::model::salary::SalaryLineItem;
use crate::store::{ContributionStore, StoreError};
use crate::utils::money::round2;

#[derive(Debug, Error, IntoStaticStr)]
pub enum CalculationError {
    #[error("failed to read salary or city standard data")]
    StoreReadFailure(#[source] StoreError),

    #[error("no salary data, upload employee salaries first")]
    NoSalaryData,

    #[error("no city standard data, upload city standards first")]
    NoCityStandard,

    #[error("failed to save calculation results")]
    StoreWriteFailure(#[source] StoreError),
}

impl CalculationError {
    /// Stable name of the failure, used as the `error` field of responses.
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    /// True when the caller can fix the failure by uploading data.
    pub fn is_missing_input(&self) -> bool {
        matches!(
            self,
            CalculationError::NoSalaryData | CalculationError::NoCityStandard
        )
    }
}

/// Which city standard a run should use.
#[derive(Debug, Clone, Default)]
pub struct StandardSelection {
    /// Restrict candidates to this city (exact match on `city_name`).
    pub city: Option<String>,
}

impl StandardSelection {
    fn admits(&self, standard: &CityStandard) -> bool {
        self.city
            .as_ref()
            .is_none_or(|city| &standard.city_name == city)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CalculationSummary {
    /// Number of employees written to the result set.
    #[schema(example = 2)]
    pub count: usize,

    #[schema(example = "2026-01-01T00:00:00Z", value_type = String, format = "date-time")]
    pub calculated_at: DateTime<Utc>,

    pub standard: CityStandard,
}

/// Picks the standard for a run: the optional city filter applies first,
/// then the most recent year, then the lowest city name.
pub fn select_standard<'a>(
    standards: &'a [CityStandard],
    selection: &StandardSelection,
) -> Option<&'a CityStandard> {
    standards
        .iter()
        .filter(|s| selection.admits(s))
        .max_by(|a, b| {
            year_rank(&a.year)
                .cmp(&year_rank(&b.year))
                .then_with(|| b.city_name.cmp(&a.city_name))
        })
}

// Numeric years compare numerically; anything else sorts below them, by text.
fn year_rank(year: &str) -> (Option<i64>, &str) {
    (year.trim().parse().ok(), year)
}

/// Pure calculation over already-loaded inputs. Output is ordered by
/// employee name.
pub fn compute_results(
    salaries: &[SalaryLineItem],
    standard: &CityStandard,
) -> Result<Vec<ContributionResult>, CalculationError> {
    if salaries.is_empty() {
        return Err(CalculationError::NoSalaryData);
    }

    let mut groups: HashMap<&str, (f64, usize)> = HashMap::new();
    for item in salaries {
        let entry = groups.entry(item.employee_name.as_str()).or_insert((0.0, 0));
        entry.0 += item.salary_amount;
        entry.1 += 1;
    }

    let mut results: Vec<ContributionResult> = groups
        .into_iter()
        .map(|(name, (total, count))| {
            let avg_salary = total / count as f64;
            let contribution_base = clamp_base(avg_salary, standard.base_min, standard.base_max);
            let company_fee = contribution_base * standard.rate;

            ContributionResult {
                employee_name: name.to_string(),
                avg_salary: round2(avg_salary),
                contribution_base: round2(contribution_base),
                company_fee: round2(company_fee),
            }
        })
        .collect();

    results.sort_by(|a, b| a.employee_name.cmp(&b.employee_name));
    Ok(results)
}

/// Inclusive clamp. Unlike `f64::clamp` this never panics when an
/// inverted standard slips through; the floor wins in that case.
fn clamp_base(avg: f64, base_min: f64, base_max: f64) -> f64 {
    if avg < base_min {
        base_min
    } else if avg > base_max {
        base_max
    } else {
        avg
    }
}

/// Recomputes every employee's contribution and replaces the stored
/// result set.
pub async fn calculate<S>(
    store: &S,
    selection: &StandardSelection,
) -> Result<CalculationSummary, CalculationError>
where
    S: ContributionStore + ?Sized,
{
    let salaries = store
        .fetch_salaries()
        .await
        .map_err(CalculationError::StoreReadFailure)?;
    if salaries.is_empty() {
        return Err(CalculationError::NoSalaryData);
    }

    let standards = store
        .fetch_city_standards()
        .await
        .map_err(CalculationError::StoreReadFailure)?;
    let standard = select_standard(&standards, selection)
        .cloned()
        .ok_or(CalculationError::NoCityStandard)?;

    let candidates = standards
        .iter()
        .filter(|s| selection.admits(s))
        .count();
    if candidates > 1 {
        warn!(
            candidates,
            city = %standard.city_name,
            year = %standard.year,
            "Several city standards match; using the most recent"
        );
    }

    let results = compute_results(&salaries, &standard)?;
    let calculated_at = Utc::now();

    store
        .replace_results(&results, calculated_at)
        .await
        .map_err(CalculationError::StoreWriteFailure)?;

    info!(
        employees = results.len(),
        salary_rows = salaries.len(),
        city = %standard.city_name,
        year = %standard.year,
        "Contribution calculation complete"
    );

    Ok(CalculationSummary {
        count: results.len(),
        calculated_at,
        standard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CityStandardStore, MemoryStore, ResultStore, SalaryStore};

    fn salary(id: &str, name: &str, month: &str, amount: f64) -> SalaryLineItem {
        SalaryLineItem {
            employee_id: id.into(),
            employee_name: name.into(),
            month: month.into(),
            salary_amount: amount,
        }
    }

    fn standard(city: &str, year: &str, base_min: f64, base_max: f64, rate: f64) -> CityStandard {
        CityStandard {
            city_name: city.into(),
            year: year.into(),
            base_min,
            base_max,
            rate,
        }
    }

    fn sample_salaries() -> Vec<SalaryLineItem> {
        vec![
            salary("E1", "Alice", "202401", 3000.0),
            salary("E1", "Alice", "202402", 5000.0),
            salary("E2", "Bob", "202401", 10000.0),
        ]
    }

    #[test]
    fn clamps_floor_and_ceiling() {
        let results =
            compute_results(&sample_salaries(), &standard("Foshan", "2024", 4000.0, 8000.0, 0.3))
                .unwrap();

        assert_eq!(
            results,
            vec![
                ContributionResult {
                    employee_name: "Alice".into(),
                    avg_salary: 4000.0,
                    contribution_base: 4000.0,
                    company_fee: 1200.0,
                },
                ContributionResult {
                    employee_name: "Bob".into(),
                    avg_salary: 10000.0,
                    contribution_base: 8000.0,
                    company_fee: 2400.0,
                },
            ]
        );
    }

    #[test]
    fn raises_low_average_to_floor() {
        let results = compute_results(
            &[salary("E1", "Carol", "202401", 1000.0)],
            &standard("Foshan", "2024", 4000.0, 8000.0, 0.3),
        )
        .unwrap();
        assert_eq!(results[0].avg_salary, 1000.0);
        assert_eq!(results[0].contribution_base, 4000.0);
    }

    #[test]
    fn in_range_average_passes_through() {
        let results = compute_results(
            &[
                salary("E1", "Dan", "202401", 5000.0),
                salary("E1", "Dan", "202402", 6000.0),
                salary("E1", "Dan", "202403", 6001.0),
            ],
            &standard("Foshan", "2024", 4000.0, 8000.0, 0.15),
        )
        .unwrap();

        // 17001 / 3 = 5667.0
        assert_eq!(results[0].avg_salary, 5667.0);
        assert_eq!(results[0].contribution_base, 5667.0);
        assert_eq!(results[0].company_fee, 850.05);
    }

    #[test]
    fn boundary_averages_are_unchanged() {
        let std = standard("Foshan", "2024", 4000.0, 8000.0, 0.1);
        let results = compute_results(
            &[
                salary("E1", "Floor", "202401", 4000.0),
                salary("E2", "Ceiling", "202401", 8000.0),
            ],
            &std,
        )
        .unwrap();

        let ceiling = results.iter().find(|r| r.employee_name == "Ceiling").unwrap();
        let floor = results.iter().find(|r| r.employee_name == "Floor").unwrap();
        assert_eq!(ceiling.contribution_base, 8000.0);
        assert_eq!(floor.contribution_base, 4000.0);
    }

    #[test]
    fn rounds_average_and_fee_to_two_places() {
        let results = compute_results(
            &[
                salary("E1", "Eve", "202401", 5000.0),
                salary("E1", "Eve", "202402", 5000.0),
                salary("E1", "Eve", "202403", 5001.0),
            ],
            &standard("Foshan", "2024", 1000.0, 9000.0, 0.3333),
        )
        .unwrap();

        // avg 5000.333..., fee taken from the unrounded base: 1666.611...
        assert_eq!(results[0].avg_salary, 5000.33);
        assert_eq!(results[0].contribution_base, 5000.33);
        assert_eq!(results[0].company_fee, 1666.61);
    }

    #[test]
    fn merges_employee_ids_sharing_a_name() {
        let results = compute_results(
            &[
                salary("E1", "Sam", "202401", 4000.0),
                salary("E9", "Sam", "202401", 6000.0),
            ],
            &standard("Foshan", "2024", 1000.0, 9000.0, 0.1),
        )
        .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].avg_salary, 5000.0);
    }

    #[test]
    fn one_result_per_distinct_name() {
        let salaries: Vec<_> = (0..30)
            .map(|i| salary(&format!("E{}", i), &format!("Name{}", i % 7), "202401", 1000.0 * i as f64))
            .collect();
        let std = standard("Foshan", "2024", 2000.0, 20000.0, 0.2);
        let results = compute_results(&salaries, &std).unwrap();

        assert_eq!(results.len(), 7);
        for r in &results {
            assert!(r.contribution_base >= std.base_min && r.contribution_base <= std.base_max);
            assert_eq!(r.company_fee, round2(r.contribution_base * std.rate));
        }
    }

    #[test]
    fn empty_salaries_is_an_error() {
        let err = compute_results(&[], &standard("Foshan", "2024", 1.0, 2.0, 0.1)).unwrap_err();
        assert!(matches!(err, CalculationError::NoSalaryData));
        assert_eq!(err.kind(), "NoSalaryData");
    }

    #[test]
    fn selects_most_recent_year_then_city_name() {
        let standards = vec![
            standard("Shenzhen", "2023", 1.0, 2.0, 0.1),
            standard("Guangzhou", "2024", 1.0, 2.0, 0.1),
            standard("Foshan", "2024", 1.0, 2.0, 0.1),
        ];

        let chosen = select_standard(&standards, &StandardSelection::default()).unwrap();
        assert_eq!((chosen.city_name.as_str(), chosen.year.as_str()), ("Foshan", "2024"));

        let shenzhen = StandardSelection {
            city: Some("Shenzhen".into()),
        };
        let chosen = select_standard(&standards, &shenzhen).unwrap();
        assert_eq!(chosen.year, "2023");

        let unknown = StandardSelection {
            city: Some("Beijing".into()),
        };
        assert!(select_standard(&standards, &unknown).is_none());
    }

    #[actix_web::test]
    async fn calculate_replaces_results_and_reports_count() {
        let store = MemoryStore::new();
        store.insert_salaries(&sample_salaries()).await.unwrap();
        store
            .insert_city_standards(&[standard("Foshan", "2024", 4000.0, 8000.0, 0.3)])
            .await
            .unwrap();

        let summary = calculate(&store, &StandardSelection::default()).await.unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.standard.city_name, "Foshan");

        let stored = store.list_results(10, 0).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].employee_name, "Bob");
        assert_eq!(stored[1].company_fee, 2400.0);
    }

    #[actix_web::test]
    async fn calculate_is_idempotent() {
        let store = MemoryStore::new();
        store.insert_salaries(&sample_salaries()).await.unwrap();
        store
            .insert_city_standards(&[standard("Foshan", "2024", 4000.0, 8000.0, 0.3)])
            .await
            .unwrap();

        let values = |rows: Vec<crate::model::contribution::ResultRecord>| {
            rows.into_iter()
                .map(|r| (r.employee_name, r.avg_salary, r.contribution_base, r.company_fee))
                .collect::<Vec<_>>()
        };

        calculate(&store, &StandardSelection::default()).await.unwrap();
        let first = values(store.list_results(10, 0).await.unwrap());
        calculate(&store, &StandardSelection::default()).await.unwrap();
        let second = values(store.list_results(10, 0).await.unwrap());

        assert_eq!(first, second);
        assert_eq!(store.count_results().await.unwrap(), 2);
    }

    #[actix_web::test]
    async fn calculate_without_salaries_writes_nothing() {
        let store = MemoryStore::new();
        store
            .replace_results(
                &[ContributionResult {
                    employee_name: "Old".into(),
                    avg_salary: 1.0,
                    contribution_base: 1.0,
                    company_fee: 1.0,
                }],
                Utc::now(),
            )
            .await
            .unwrap();

        let err = calculate(&store, &StandardSelection::default()).await.unwrap_err();
        assert!(matches!(err, CalculationError::NoSalaryData));
        assert_eq!(store.count_results().await.unwrap(), 1);
    }

    #[actix_web::test]
    async fn calculate_without_standard_fails() {
        let store = MemoryStore::new();
        store.insert_salaries(&sample_salaries()).await.unwrap();

        let err = calculate(&store, &StandardSelection::default()).await.unwrap_err();
        assert!(matches!(err, CalculationError::NoCityStandard));
        assert!(err.is_missing_input());
    }

    #[actix_web::test]
    async fn store_failures_are_classified() {
        let store = MemoryStore::new();
        store.insert_salaries(&sample_salaries()).await.unwrap();
        store
            .insert_city_standards(&[standard("Foshan", "2024", 4000.0, 8000.0, 0.3)])
            .await
            .unwrap();

        store.fail_writes(true).await;
        let err = calculate(&store, &StandardSelection::default()).await.unwrap_err();
        assert_eq!(err.kind(), "StoreWriteFailure");

        store.fail_writes(false).await;
        store.fail_reads(true).await;
        let err = calculate(&store, &StandardSelection::default()).await.unwrap_err();
        assert_eq!(err.kind(), "StoreReadFailure");
        assert!(!err.is_missing_input());
    }

    #[actix_web::test]
    async fn failed_calculation_keeps_previous_results() {
        let store = MemoryStore::new();
        store.insert_salaries(&sample_salaries()).await.unwrap();
        store
            .insert_city_standards(&[standard("Foshan", "2024", 4000.0, 8000.0, 0.3)])
            .await
            .unwrap();
        store
            .replace_results(
                &[ContributionResult {
                    employee_name: "Old".into(),
                    avg_salary: 1.0,
                    contribution_base: 2.0,
                    company_fee: 3.0,
                }],
                Utc::now(),
            )
            .await
            .unwrap();
        let before = store.list_results(10, 0).await.unwrap();

        store.fail_writes(true).await;
        let err = calculate(&store, &StandardSelection::default()).await.unwrap_err();
        assert!(matches!(err, CalculationError::StoreWriteFailure(_)));

        store.fail_writes(false).await;
        store.fail_reads(true).await;
        let err = calculate(&store, &StandardSelection::default()).await.unwrap_err();
        assert!(matches!(err, CalculationError::StoreReadFailure(_)));

        store.fail_reads(false).await;
        let after = store.list_results(10, 0).await.unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].id, before[0].id);
        assert_eq!(after[0].employee_name, "Old");
        assert_eq!(
            (after[0].avg_salary, after[0].contribution_base, after[0].company_fee),
            (1.0, 2.0, 3.0)
        );
    }
}
