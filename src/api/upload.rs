use actix_multipart::Multipart;
use actix_web::{HttpResponse, Responder, web};
use futures_util::TryStreamExt;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::config::Config;
use crate::ingest::headers::{CITY_FIELDS, FieldHeaders, SALARY_FIELDS, missing_fields};
use crate::ingest::{self, IngestError, Parsed, SheetRow, city, salary, sheet};
use crate::state::AppState;
use crate::store::{ContributionStore, StoreError};

#[derive(Serialize, ToSchema, Debug)]
pub struct UploadResponse {
    #[schema(example = true)]
    pub success: bool,

    #[schema(example = "Imported 12 rows")]
    pub message: String,

    #[schema(example = 12)]
    pub imported: u64,

    #[schema(example = 1)]
    pub skipped: usize,

    #[schema(example = json!(["E001 (202401)"]))]
    pub skipped_items: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = json!(["row 5: missing employee id, name or month"]))]
    pub errors: Option<Vec<String>>,
}

/// Outcome of importing already-parsed rows.
#[derive(Debug)]
pub enum Import {
    Done(UploadResponse),
    /// Every row failed validation.
    NothingValid(Vec<String>),
}

struct UploadedFile {
    filename: String,
    bytes: Vec<u8>,
}

fn reject(status: actix_web::http::StatusCode, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(json!({
        "success": false,
        "message": message.into(),
    }))
}

/// Pulls the `file` part out of a multipart body, enforcing the extension
/// and size limits.
async fn read_file_field(
    mut payload: Multipart,
    max_bytes: usize,
) -> Result<UploadedFile, HttpResponse> {
    use actix_web::http::StatusCode;

    while let Some(mut field) = payload.try_next().await.map_err(|e| {
        warn!(error = %e, "Malformed multipart body");
        reject(StatusCode::BAD_REQUEST, "Malformed upload body")
    })? {
        let disposition = field.content_disposition();
        if disposition.get_name() != Some("file") {
            continue;
        }
        let filename = disposition.get_filename().unwrap_or_default().to_string();

        let lower = filename.to_lowercase();
        if !lower.ends_with(".xlsx") && !lower.ends_with(".xls") {
            return Err(reject(
                StatusCode::BAD_REQUEST,
                "Please upload an Excel file (.xlsx or .xls)",
            ));
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(|e| {
            warn!(error = %e, "Upload interrupted");
            reject(StatusCode::BAD_REQUEST, "Malformed upload body")
        })? {
            if bytes.len() + chunk.len() > max_bytes {
                return Err(reject(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    format!("File exceeds the {} byte limit", max_bytes),
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        return Ok(UploadedFile { filename, bytes });
    }

    Err(reject(StatusCode::BAD_REQUEST, "Please choose a file"))
}

/// Reads the upload's first sheet off the async executor.
async fn read_rows(upload: UploadedFile) -> Result<(Vec<String>, Vec<SheetRow>), HttpResponse> {
    let filename = upload.filename;
    let read = web::block(move || sheet::read_first_sheet(upload.bytes))
        .await
        .map_err(|e| {
            error!(error = %e, "Spreadsheet reader task failed");
            reject(
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Server error",
            )
        })?;

    read.map_err(|e: IngestError| {
        warn!(error = %e, filename = %filename, "Unreadable spreadsheet");
        reject(
            actix_web::http::StatusCode::BAD_REQUEST,
            format!("Could not read the spreadsheet: {}", e),
        )
    })
}

fn nothing_valid(errors: Vec<String>, headers: &[String], fields: &[&FieldHeaders]) -> HttpResponse {
    let missing = missing_fields(fields, headers);
    let message = if missing.is_empty() {
        "No valid data".to_string()
    } else {
        format!("No valid data; missing columns: {}", missing.join(", "))
    };

    HttpResponse::BadRequest().json(json!({
        "success": false,
        "message": message,
        "errors": errors,
    }))
}

fn import_failed(e: StoreError) -> HttpResponse {
    match e {
        StoreError::Conflict(detail) => {
            warn!(detail = %detail, "Upload collided with existing rows");
            reject(
                actix_web::http::StatusCode::CONFLICT,
                "Some rows were stored concurrently, please retry the upload",
            )
        }
        e => {
            error!(error = %e, "Failed to store uploaded rows");
            reject(
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to insert data",
            )
        }
    }
}

fn finish(
    parsed_errors: Vec<String>,
    imported: u64,
    skipped_items: Vec<String>,
) -> UploadResponse {
    UploadResponse {
        success: true,
        message: format!("Imported {} rows", imported),
        imported,
        skipped: skipped_items.len(),
        skipped_items,
        errors: (!parsed_errors.is_empty()).then_some(parsed_errors),
    }
}

/// Validates salary rows, drops already-stored `(employee_id, month)`
/// pairs and inserts the rest.
pub async fn import_salary_rows(
    store: &dyn ContributionStore,
    rows: &[SheetRow],
) -> Result<Import, StoreError> {
    let Parsed { data, errors } = salary::parse_salary_rows(rows);
    if data.is_empty() {
        return Ok(Import::NothingValid(errors));
    }

    let existing = store.salary_keys().await?;
    let (kept, skipped) = ingest::dedup(
        data,
        existing,
        |r| r.key(),
        |r| format!("{} ({})", r.employee_id, r.month),
    );

    let imported = if kept.is_empty() {
        0
    } else {
        store.insert_salaries(&kept).await?
    };

    Ok(Import::Done(finish(errors, imported, skipped)))
}

/// Validates city-standard rows, drops already-stored `(city_name, year)`
/// pairs and inserts the rest.
pub async fn import_city_rows(
    store: &dyn ContributionStore,
    rows: &[SheetRow],
) -> Result<Import, StoreError> {
    let Parsed { data, errors } = city::parse_city_rows(rows);
    if data.is_empty() {
        return Ok(Import::NothingValid(errors));
    }

    let existing = store.city_keys().await?;
    let (kept, skipped) = ingest::dedup(
        data,
        existing,
        |r| r.key(),
        |r| format!("{} ({})", r.city_name, r.year),
    );

    let imported = if kept.is_empty() {
        0
    } else {
        store.insert_city_standards(&kept).await?
    };

    Ok(Import::Done(finish(errors, imported, skipped)))
}

/// Upload employee salaries
#[utoipa::path(
    post,
    path = "/api/upload/salaries",
    request_body(content = String, content_type = "multipart/form-data", description = "Excel workbook in the `file` field"),
    responses(
        (status = 200, description = "Rows imported", body = UploadResponse),
        (status = 400, description = "Missing file, wrong type, unreadable sheet or no valid rows"),
        (status = 409, description = "Rows collided with a concurrent upload"),
        (status = 413, description = "File too large"),
        (status = 500, description = "Store failure")
    ),
    tag = "Upload"
)]
pub async fn upload_salaries(
    state: web::Data<AppState>,
    config: web::Data<Config>,
    payload: Multipart,
) -> impl Responder {
    let upload = match read_file_field(payload, config.max_upload_bytes).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    let (headers, rows) = match read_rows(upload).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match import_salary_rows(state.store.as_ref(), &rows).await {
        Ok(Import::Done(body)) => {
            info!(imported = body.imported, skipped = body.skipped, "Salary upload complete");
            HttpResponse::Ok().json(body)
        }
        Ok(Import::NothingValid(errors)) => nothing_valid(errors, &headers, &SALARY_FIELDS),
        Err(e) => import_failed(e),
    }
}

/// Upload city contribution standards
#[utoipa::path(
    post,
    path = "/api/upload/cities",
    request_body(content = String, content_type = "multipart/form-data", description = "Excel workbook in the `file` field"),
    responses(
        (status = 200, description = "Rows imported", body = UploadResponse),
        (status = 400, description = "Missing file, wrong type, unreadable sheet or no valid rows"),
        (status = 409, description = "Rows collided with a concurrent upload"),
        (status = 413, description = "File too large"),
        (status = 500, description = "Store failure")
    ),
    tag = "Upload"
)]
pub async fn upload_cities(
    state: web::Data<AppState>,
    config: web::Data<Config>,
    payload: Multipart,
) -> impl Responder {
    let upload = match read_file_field(payload, config.max_upload_bytes).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    let (headers, rows) = match read_rows(upload).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match import_city_rows(state.store.as_ref(), &rows).await {
        Ok(Import::Done(body)) => {
            info!(imported = body.imported, skipped = body.skipped, "City standard upload complete");
            HttpResponse::Ok().json(body)
        }
        Ok(Import::NothingValid(errors)) => nothing_valid(errors, &headers, &CITY_FIELDS),
        Err(e) => import_failed(e),
    }
}
