//! Batch operation endpoints
//!
//! CSV upload (fire-and-track submission) plus the status and progress
//! polling endpoints.

use crate::core::models::ValidationErrorDetail;
use crate::server::state::AppState;
use crate::utils::csv::CsvValidator;
use crate::utils::error::ServiceError;
use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use futures::StreamExt;
use tracing::{error, info};

/// Configure batch routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/batch")
            .route("/upload-csv", web::post().to(upload_csv))
            .route("/{batch_id}/status", web::get().to(get_batch_status))
            .route("/{batch_id}/progress", web::get().to(get_batch_progress)),
    );
}

/// Upload a CSV and initiate bulk hospital creation.
///
/// Returns 202 Accepted with a batch identity immediately; creation runs in
/// the background and is observed through the polling endpoints.
pub async fn upload_csv(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, ServiceError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut filename = String::new();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| {
            error!("Error reading multipart field: {}", e);
            ServiceError::BadRequest(format!("Invalid multipart data: {e}"))
        })?;

        let field_name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };

        if field_name == "file" {
            if let Some(cd) = field.content_disposition() {
                if let Some(fname) = cd.get_filename() {
                    filename = fname.to_string();
                }
            }

            let mut data = Vec::new();
            while let Some(chunk) = field.next().await {
                let bytes = chunk.map_err(|e| {
                    error!("Error reading file chunk: {}", e);
                    ServiceError::BadRequest("Error reading file".to_string())
                })?;
                data.extend_from_slice(&bytes);
            }
            file_data = Some(data);
        }
    }

    let content = file_data
        .ok_or_else(|| ServiceError::BadRequest("Missing 'file' field".to_string()))?;

    if !filename.ends_with(".csv") {
        return Err(ServiceError::CsvValidation(vec![ValidationErrorDetail::new(
            vec!["file".into(), "filename".into()],
            "File must be a CSV file",
            "file_type_error",
        )]));
    }

    let rows = CsvValidator::new(&state.settings).validate_and_parse(&content)?;
    info!(rows = rows.len(), filename = %filename, "CSV upload validated");

    let response = state.orchestrator.submit(rows);
    Ok(HttpResponse::Accepted().json(response))
}

/// Current batch status, reconciled against the directory once terminal
pub async fn get_batch_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let batch_id = path.into_inner();
    let response = state.orchestrator.get_status(&batch_id).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Real-time processing progress; cheap enough to poll every second
pub async fn get_batch_progress(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let batch_id = path.into_inner();
    let response = state.orchestrator.get_progress(&batch_id)?;
    Ok(HttpResponse::Ok().json(response))
}
