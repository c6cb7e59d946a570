use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};
use utoipa::{IntoParams, ToSchema};

use crate::calculation::{self, CalculationError, StandardSelection};
use crate::config::Config;
use crate::model::city_standard::CityStandard;
use crate::state::AppState;

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct CalculateQuery {
    /// Use this city's standard instead of the configured default
    #[schema(example = "Foshan")]
    pub city: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct CalculateResponse {
    #[schema(example = true)]
    pub success: bool,

    #[schema(example = "Calculation complete, 2 employees processed")]
    pub message: String,

    #[schema(example = 2)]
    pub count: usize,

    #[schema(example = "2026-01-01T00:00:00Z", value_type = String, format = "date-time")]
    pub calculated_at: DateTime<Utc>,

    pub standard: CityStandard,
}

/// Recompute contributions
#[utoipa::path(
    post,
    path = "/api/calculate",
    params(CalculateQuery),
    responses(
        (status = 200, description = "Result set replaced", body = CalculateResponse),
        (status = 400, description = "No salary or city standard data", body = Object, example = json!({
            "success": false,
            "error": "NoSalaryData",
            "message": "no salary data, upload employee salaries first"
        })),
        (status = 500, description = "Store read or write failed", body = Object, example = json!({
            "success": false,
            "error": "StoreWriteFailure",
            "message": "failed to save calculation results"
        }))
    ),
    tag = "Calculation"
)]
pub async fn calculate(
    state: web::Data<AppState>,
    config: web::Data<Config>,
    query: web::Query<CalculateQuery>,
) -> impl Responder {
    let selection = StandardSelection {
        city: query
            .into_inner()
            .city
            .filter(|c| !c.trim().is_empty())
            .or_else(|| config.default_city.clone()),
    };

    match calculation::calculate(state.store.as_ref(), &selection).await {
        Ok(summary) => {
            info!(count = summary.count, "Calculate request succeeded");
            HttpResponse::Ok().json(CalculateResponse {
                success: true,
                message: format!(
                    "Calculation complete, {} employees processed",
                    summary.count
                ),
                count: summary.count,
                calculated_at: summary.calculated_at,
                standard: summary.standard,
            })
        }
        Err(e) => failure_response(&e),
    }
}

fn failure_response(e: &CalculationError) -> HttpResponse {
    let body = json!({
        "success": false,
        "error": e.kind(),
        "message": e.to_string(),
    });

    if e.is_missing_input() {
        warn!(error = %e, "Calculation rejected");
        HttpResponse::BadRequest().json(body)
    } else {
        // source carries the store's own message
        error!(error = %e, source = ?std::error::Error::source(e), "Calculation failed");
        HttpResponse::InternalServerError().json(body)
    }
}
