use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Contribution-base floor, ceiling and company rate for one city and year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct CityStandard {
    #[schema(example = "Foshan")]
    pub city_name: String,

    #[schema(example = "2024")]
    pub year: String,

    #[schema(example = 4546.0)]
    pub base_min: f64,

    #[schema(example = 26421.0)]
    pub base_max: f64,

    #[schema(example = 0.15)]
    pub rate: f64,
}

impl CityStandard {
    pub fn key(&self) -> (String, String) {
        (self.city_name.clone(), self.year.clone())
    }
}
