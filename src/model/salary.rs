use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One employee's salary for one month, as uploaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct SalaryLineItem {
    #[schema(example = "E001")]
    pub employee_id: String,

    #[schema(example = "Alice")]
    pub employee_name: String,

    #[schema(example = "202401")]
    pub month: String,

    #[schema(example = 5000.0)]
    pub salary_amount: f64,
}

impl SalaryLineItem {
    /// Uniqueness key in the salary store.
    pub fn key(&self) -> (String, String) {
        (self.employee_id.clone(), self.month.clone())
    }
}
