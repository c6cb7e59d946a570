use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySql, MySqlPool, QueryBuilder};
use std::collections::HashSet;
use tracing::debug;

use super::{CityStandardStore, ResultStore, SalaryStore, StoreError, StoreResult};
use crate::model::city_standard::CityStandard;
use crate::model::contribution::{ContributionResult, ResultRecord};
use crate::model::salary::SalaryLineItem;

/// Rows per multi-row INSERT; keeps statements well under the placeholder limit.
const INSERT_CHUNK: usize = 500;

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SalaryStore for MySqlStore {
    async fn fetch_salaries(&self) -> StoreResult<Vec<SalaryLineItem>> {
        let rows = sqlx::query_as::<_, SalaryLineItem>(
            r#"
            SELECT employee_id, employee_name, month, salary_amount
            FROM salaries
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn salary_keys(&self) -> StoreResult<HashSet<(String, String)>> {
        let keys = sqlx::query_as::<_, (String, String)>(
            r#"SELECT employee_id, month FROM salaries"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(keys.into_iter().collect())
    }

    async fn insert_salaries(&self, rows: &[SalaryLineItem]) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for chunk in rows.chunks(INSERT_CHUNK) {
            let mut builder: QueryBuilder<MySql> = QueryBuilder::new(
                "INSERT INTO salaries (employee_id, employee_name, month, salary_amount) ",
            );
            builder.push_values(chunk, |mut b, row| {
                b.push_bind(&row.employee_id)
                    .push_bind(&row.employee_name)
                    .push_bind(&row.month)
                    .push_bind(row.salary_amount);
            });
            let result = builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(StoreError::from_insert)?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        debug!(inserted, "Inserted salary rows");
        Ok(inserted)
    }
}

#[async_trait]
impl CityStandardStore for MySqlStore {
    async fn fetch_city_standards(&self) -> StoreResult<Vec<CityStandard>> {
        let rows = sqlx::query_as::<_, CityStandard>(
            r#"
            SELECT city_name, year, base_min, base_max, rate
            FROM cities
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn city_keys(&self) -> StoreResult<HashSet<(String, String)>> {
        let keys = sqlx::query_as::<_, (String, String)>(r#"SELECT city_name, year FROM cities"#)
            .fetch_all(&self.pool)
            .await?;
        Ok(keys.into_iter().collect())
    }

    async fn insert_city_standards(&self, rows: &[CityStandard]) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for chunk in rows.chunks(INSERT_CHUNK) {
            let mut builder: QueryBuilder<MySql> =
                QueryBuilder::new("INSERT INTO cities (city_name, year, base_min, base_max, rate) ");
            builder.push_values(chunk, |mut b, row| {
                b.push_bind(&row.city_name)
                    .push_bind(&row.year)
                    .push_bind(row.base_min)
                    .push_bind(row.base_max)
                    .push_bind(row.rate);
            });
            let result = builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(StoreError::from_insert)?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        debug!(inserted, "Inserted city standard rows");
        Ok(inserted)
    }
}

#[async_trait]
impl ResultStore for MySqlStore {
    async fn replace_results(
        &self,
        rows: &[ContributionResult],
        calculated_at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        // delete + insert commit together or not at all
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query(r#"DELETE FROM results"#)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let mut inserted = 0;
        for chunk in rows.chunks(INSERT_CHUNK) {
            let mut builder: QueryBuilder<MySql> = QueryBuilder::new(
                "INSERT INTO results \
                 (employee_name, avg_salary, contribution_base, company_fee, calculated_at) ",
            );
            builder.push_values(chunk, |mut b, row| {
                b.push_bind(&row.employee_name)
                    .push_bind(row.avg_salary)
                    .push_bind(row.contribution_base)
                    .push_bind(row.company_fee)
                    .push_bind(calculated_at);
            });
            inserted += builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        debug!(deleted, inserted, "Replaced result set");
        Ok(inserted)
    }

    async fn count_results(&self) -> StoreResult<i64> {
        let total = sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM results"#)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn list_results(&self, limit: u32, offset: u32) -> StoreResult<Vec<ResultRecord>> {
        let rows = sqlx::query_as::<_, ResultRecord>(
            r#"
            SELECT id, employee_name, avg_salary, contribution_base, company_fee, calculated_at
            FROM results
            ORDER BY employee_name ASC, id ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
