use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use utoipa::{IntoParams, ToSchema};

use crate::model::contribution::ResultRecord;
use crate::state::AppState;

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ResultsQuery {
    #[schema(example = 1)]
    pub page: Option<u32>,

    #[schema(example = 100)]
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResultResponse {
    #[schema(example = true)]
    pub success: bool,
    pub data: Vec<ResultRecord>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 100)]
    pub per_page: u32,
    #[schema(example = 2)]
    pub total: i64,
}

/// List calculation results, ordered by employee name
#[utoipa::path(
    get,
    path = "/api/results",
    params(ResultsQuery),
    responses(
        (status = 200, body = PaginatedResultResponse),
        (status = 500, description = "Store read failed")
    ),
    tag = "Calculation"
)]
pub async fn list_results(
    state: web::Data<AppState>,
    query: web::Query<ResultsQuery>,
) -> actix_web::Result<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(100).clamp(1, 500);
    let offset = (page - 1).saturating_mul(per_page);

    let total = state.store.count_results().await.map_err(|e| {
        error!(error = %e, "Failed to count results");
        ErrorInternalServerError("Internal Server Error")
    })?;

    debug!(page, per_page, offset, "Fetching results");
    let data = state
        .store
        .list_results(per_page, offset)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch result list");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(PaginatedResultResponse {
        success: true,
        data,
        page,
        per_page,
        total,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::contribution::ContributionResult;
    use crate::store::{MemoryStore, ResultStore};
    use actix_web::{App, http::StatusCode, test};
    use chrono::Utc;
    use serde_json::Value;
    use std::sync::Arc;

    macro_rules! results_app {
        ($store:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(AppState::new(Arc::new($store))))
                    .route("/results", web::get().to(list_results)),
            )
            .await
        };
    }

    fn result(name: &str, avg: f64) -> ContributionResult {
        ContributionResult {
            employee_name: name.into(),
            avg_salary: avg,
            contribution_base: avg,
            company_fee: avg / 10.0,
        }
    }

    #[actix_web::test]
    async fn pages_through_sorted_results() {
        let store = MemoryStore::new();
        store
            .replace_results(
                &[result("Carol", 3.0), result("Alice", 1.0), result("Bob", 2.0)],
                Utc::now(),
            )
            .await
            .unwrap();
        let app = results_app!(store);

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/results?page=2&per_page=2").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["total"], 3);
        assert_eq!(body["page"], 2);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["employee_name"], "Carol");
    }

    #[actix_web::test]
    async fn clamps_paging_parameters() {
        let app = results_app!(MemoryStore::new());

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/results?page=0&per_page=100000").to_request(),
        )
        .await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["page"], 1);
        assert_eq!(body["per_page"], 500);
        assert_eq!(body["data"], Value::Array(vec![]));
    }

    #[actix_web::test]
    async fn read_failure_is_a_server_error() {
        let store = MemoryStore::new();
        store.fail_reads(true).await;
        let app = results_app!(store);

        let resp = test::call_service(&app, test::TestRequest::get().uri("/results").to_request()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
