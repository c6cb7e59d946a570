use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Computed contribution figures for one employee, rounded for storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ContributionResult {
    #[schema(example = "Alice")]
    pub employee_name: String,

    #[schema(example = 4000.0)]
    pub avg_salary: f64,

    #[schema(example = 4000.0)]
    pub contribution_base: f64,

    #[schema(example = 1200.0)]
    pub company_fee: f64,
}

/// A stored result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct ResultRecord {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Alice")]
    pub employee_name: String,

    #[schema(example = 4000.0)]
    pub avg_salary: f64,

    #[schema(example = 4000.0)]
    pub contribution_base: f64,

    #[schema(example = 1200.0)]
    pub company_fee: f64,

    #[schema(example = "2026-01-01T00:00:00Z", value_type = String, format = "date-time")]
    pub calculated_at: DateTime<Utc>,
}
