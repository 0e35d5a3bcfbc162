//! Core functionality for the batch processor
//!
//! This module contains the batch orchestration engine: data model, store,
//! bounded fan-out executor, and the orchestrator that ties them together.

pub mod executor;
pub mod models;
pub mod orchestrator;
pub mod store;

pub use models::{
    BatchProcessingStatus, BatchProgressResponse, BatchRecord, BatchStatusResponse,
    BatchUploadResponse, HospitalRecord, HospitalStatus, ParsedRow,
};
pub use orchestrator::BatchOrchestrator;
pub use store::BatchStore;
