use crate::api::calculate::{CalculateQuery, CalculateResponse};
use crate::api::results::{PaginatedResultResponse, ResultsQuery};
use crate::api::upload::UploadResponse;
use crate::calculation::CalculationSummary;
use crate::model::city_standard::CityStandard;
use crate::model::contribution::{ContributionResult, ResultRecord};
use crate::model::salary::SalaryLineItem;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Contribution Calculator API",
        version = "0.1.0",
        description = r#"
## Social-insurance contribution calculator

Computes each employee's monthly social-insurance contribution from
uploaded payroll and city-standard spreadsheets.

### Workflow
1. **Upload city standards** (`/upload/cities`): floor, ceiling and company rate per city and year
2. **Upload salaries** (`/upload/salaries`): one row per employee per month
3. **Calculate** (`/calculate`): average salary per employee, clamped into the
   standard's range, multiplied by the rate
4. **Read results** (`/results`)

### Notes
- Results are grouped by employee **name**
- Every calculation replaces the whole result set
- Figures are rounded to two decimals, half away from zero
"#,
    ),
    paths(
        crate::api::calculate::calculate,
        crate::api::results::list_results,
        crate::api::upload::upload_salaries,
        crate::api::upload::upload_cities
    ),
    components(
        schemas(
            CalculateQuery,
            CalculateResponse,
            CalculationSummary,
            ResultsQuery,
            PaginatedResultResponse,
            UploadResponse,
            SalaryLineItem,
            CityStandard,
            ContributionResult,
            ResultRecord
        )
    ),
    tags(
        (name = "Calculation", description = "Contribution calculation and results"),
        (name = "Upload", description = "Spreadsheet uploads"),
    )
)]
pub struct ApiDoc;
