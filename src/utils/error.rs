//! Error handling for the batch processor
//!
//! This module defines the service-wide error type and its mapping onto HTTP
//! responses.

use crate::core::models::ValidationErrorDetail;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

/// Result type alias for the service
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client errors
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV validation failures, attributed per row/field
    #[error("CSV validation failed")]
    CsvValidation(Vec<ValidationErrorDetail>),

    /// Unknown batch identity
    #[error("Batch with ID {0} not found")]
    BatchNotFound(String),

    /// Malformed upload payloads (missing file field, wrong extension)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ResponseError for ServiceError {
    fn error_response(&self) -> HttpResponse {
        match self {
            ServiceError::BatchNotFound(_) => HttpResponse::NotFound().json(serde_json::json!({
                "detail": self.to_string(),
            })),
            ServiceError::CsvValidation(errors) => {
                HttpResponse::UnprocessableEntity().json(serde_json::json!({
                    "detail": errors,
                }))
            }
            ServiceError::BadRequest(_) => HttpResponse::BadRequest().json(serde_json::json!({
                "detail": self.to_string(),
            })),
            ServiceError::HttpClient(_) => HttpResponse::BadGateway().json(serde_json::json!({
                "detail": self.to_string(),
            })),
            _ => HttpResponse::InternalServerError().json(serde_json::json!({
                "detail": self.to_string(),
            })),
        }
    }
}
