//! # Hospital Batch Processor
//!
//! Bulk hospital creation service. A CSV upload is validated, assigned a
//! batch identity, and fanned out as concurrent creation requests against an
//! external hospital directory, capped at 20 in flight. Clients poll the
//! batch's progress and status; once a batch finishes, status queries
//! reconcile local records against the directory's current truth.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use hospital_batch_rs::server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     server::run_server().await?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod server;
pub mod services;
pub mod utils;

// Re-export main types
pub use crate::config::Settings;
pub use crate::core::{
    BatchOrchestrator, BatchProcessingStatus, BatchProgressResponse, BatchRecord,
    BatchStatusResponse, BatchStore, BatchUploadResponse, HospitalRecord, HospitalStatus,
    ParsedRow,
};
pub use crate::services::{DirectoryError, HospitalDirectory, HttpHospitalDirectory};
pub use crate::utils::error::{Result, ServiceError};
