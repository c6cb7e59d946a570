use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{CityStandardStore, ResultStore, SalaryStore, StoreError, StoreResult};
use crate::model::city_standard::CityStandard;
use crate::model::contribution::{ContributionResult, ResultRecord};
use crate::model::salary::SalaryLineItem;

#[derive(Default)]
struct Tables {
    salaries: Vec<SalaryLineItem>,
    cities: Vec<CityStandard>,
    results: Vec<ResultRecord>,
    next_result_id: u64,
}

/// Process-local store used when no database is configured, and as the
/// test double for the calculator and handlers.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    failures: Arc<Mutex<Failures>>,
}

#[derive(Default, Clone, Copy)]
struct Failures {
    reads: bool,
    writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    /// Makes every subsequent read fail with `StoreError::Unavailable`.
    pub async fn fail_reads(&self, fail: bool) {
        self.failures.lock().await.reads = fail;
    }

    #[cfg(test)]
    /// Makes every subsequent write fail with `StoreError::Unavailable`.
    pub async fn fail_writes(&self, fail: bool) {
        self.failures.lock().await.writes = fail;
    }

    async fn check_read(&self) -> StoreResult<()> {
        if self.failures.lock().await.reads {
            return Err(StoreError::Unavailable("read refused".into()));
        }
        Ok(())
    }

    async fn check_write(&self) -> StoreResult<()> {
        if self.failures.lock().await.writes {
            return Err(StoreError::Unavailable("write refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SalaryStore for MemoryStore {
    async fn fetch_salaries(&self) -> StoreResult<Vec<SalaryLineItem>> {
        self.check_read().await?;
        Ok(self.tables.lock().await.salaries.clone())
    }

    async fn salary_keys(&self) -> StoreResult<HashSet<(String, String)>> {
        self.check_read().await?;
        Ok(self
            .tables
            .lock()
            .await
            .salaries
            .iter()
            .map(SalaryLineItem::key)
            .collect())
    }

    async fn insert_salaries(&self, rows: &[SalaryLineItem]) -> StoreResult<u64> {
        self.check_write().await?;
        let mut tables = self.tables.lock().await;
        let existing: HashSet<_> = tables.salaries.iter().map(SalaryLineItem::key).collect();
        if let Some(dup) = rows.iter().find(|r| existing.contains(&r.key())) {
            return Err(StoreError::Conflict(format!(
                "salary {} ({})",
                dup.employee_id, dup.month
            )));
        }
        tables.salaries.extend_from_slice(rows);
        Ok(rows.len() as u64)
    }
}

#[async_trait]
impl CityStandardStore for MemoryStore {
    async fn fetch_city_standards(&self) -> StoreResult<Vec<CityStandard>> {
        self.check_read().await?;
        Ok(self.tables.lock().await.cities.clone())
    }

    async fn city_keys(&self) -> StoreResult<HashSet<(String, String)>> {
        self.check_read().await?;
        Ok(self
            .tables
            .lock()
            .await
            .cities
            .iter()
            .map(CityStandard::key)
            .collect())
    }

    async fn insert_city_standards(&self, rows: &[CityStandard]) -> StoreResult<u64> {
        self.check_write().await?;
        let mut tables = self.tables.lock().await;
        let existing: HashSet<_> = tables.cities.iter().map(CityStandard::key).collect();
        if let Some(dup) = rows.iter().find(|r| existing.contains(&r.key())) {
            return Err(StoreError::Conflict(format!(
                "city {} ({})",
                dup.city_name, dup.year
            )));
        }
        tables.cities.extend_from_slice(rows);
        Ok(rows.len() as u64)
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn replace_results(
        &self,
        rows: &[ContributionResult],
        calculated_at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        self.check_write().await?;
        let mut tables = self.tables.lock().await;

        let mut next_id = tables.next_result_id;
        let replacement: Vec<ResultRecord> = rows
            .iter()
            .map(|r| {
                next_id += 1;
                ResultRecord {
                    id: next_id,
                    employee_name: r.employee_name.clone(),
                    avg_salary: r.avg_salary,
                    contribution_base: r.contribution_base,
                    company_fee: r.company_fee,
                    calculated_at,
                }
            })
            .collect();

        tables.next_result_id = next_id;
        tables.results = replacement;
        Ok(rows.len() as u64)
    }

    async fn count_results(&self) -> StoreResult<i64> {
        self.check_read().await?;
        Ok(self.tables.lock().await.results.len() as i64)
    }

    async fn list_results(&self, limit: u32, offset: u32) -> StoreResult<Vec<ResultRecord>> {
        self.check_read().await?;
        let tables = self.tables.lock().await;
        let mut sorted: Vec<&ResultRecord> = tables.results.iter().collect();
        sorted.sort_by(|a, b| a.employee_name.cmp(&b.employee_name).then(a.id.cmp(&b.id)));
        Ok(sorted
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
