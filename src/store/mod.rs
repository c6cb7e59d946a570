//! Persistence collaborators for the calculator and the upload handlers.
//!
//! The three traits mirror the three tables the service touches. Both
//! backends implement all of them, so handlers hold a single
//! `Arc<dyn ContributionStore>`.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::city_standard::CityStandard;
use crate::model::contribution::{ContributionResult, ResultRecord};
use crate::model::salary::SalaryLineItem;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A unique key was violated on insert.
    #[error("duplicate row: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Maps MySQL's integrity-constraint SQLSTATE to `Conflict`.
    pub(crate) fn from_insert(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.code().as_deref() == Some("23000") {
                return StoreError::Conflict(db_err.message().to_string());
            }
        }
        StoreError::Database(e)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait SalaryStore: Send + Sync {
    async fn fetch_salaries(&self) -> StoreResult<Vec<SalaryLineItem>>;
    /// `(employee_id, month)` pairs already stored.
    async fn salary_keys(&self) -> StoreResult<HashSet<(String, String)>>;
    async fn insert_salaries(&self, rows: &[SalaryLineItem]) -> StoreResult<u64>;
}

#[async_trait]
pub trait CityStandardStore: Send + Sync {
    async fn fetch_city_standards(&self) -> StoreResult<Vec<CityStandard>>;
    /// `(city_name, year)` pairs already stored.
    async fn city_keys(&self) -> StoreResult<HashSet<(String, String)>>;
    async fn insert_city_standards(&self, rows: &[CityStandard]) -> StoreResult<u64>;
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Deletes every stored result and inserts `rows` as one unit.
    async fn replace_results(
        &self,
        rows: &[ContributionResult],
        calculated_at: DateTime<Utc>,
    ) -> StoreResult<u64>;
    async fn count_results(&self) -> StoreResult<i64>;
    /// Stored results ordered by employee name.
    async fn list_results(&self, limit: u32, offset: u32) -> StoreResult<Vec<ResultRecord>>;
}

pub trait ContributionStore: SalaryStore + CityStandardStore + ResultStore {}

impl<T: SalaryStore + CityStandardStore + ResultStore> ContributionStore for T {}
