//! Health check and index endpoints

use crate::core::models::HealthResponse;
use actix_web::{HttpResponse, Result as ActixResult, web};
use tracing::debug;

/// Configure health routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/", web::get().to(index));
}

/// Basic health check endpoint, used by load balancers and monitors
pub async fn health_check() -> ActixResult<HttpResponse> {
    debug!("Health check requested");

    Ok(HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

/// Root index pointing at the useful endpoints
async fn index() -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Hospital Batch Processor API",
        "health": "/health",
        "upload": "/batch/upload-csv",
    })))
}
