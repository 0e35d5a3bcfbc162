//! Core data model for batch processing
//!
//! This module defines the lifecycle enums, the in-memory batch bookkeeping
//! records, and the wire schemas exchanged with the external hospital
//! directory and with polling clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one hospital creation attempt, refined by later reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HospitalStatus {
    /// Created and confirmed active in the directory
    CreatedAndActivated,
    /// Created but not yet confirmed active
    Created,
    /// Creation attempt errored or was rejected by the directory
    Failed,
    /// Reconciliation found the remote entity no longer exists
    Deleted,
}

/// Batch lifecycle status; transitions are forward-only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    PartiallyCompleted,
}

impl BatchProcessingStatus {
    /// Whether the batch has reached one of the three final states
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::PartiallyCompleted | Self::Failed
        )
    }

    /// Terminal and at least partially successful; reconciliation against the
    /// directory only makes sense in these states
    pub fn is_success_bearing(&self) -> bool {
        matches!(self, Self::Completed | Self::PartiallyCompleted)
    }
}

/// One validated input row, ready for submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRow {
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
}

// ---------------------------------------------------------------------------
// External directory API schemas
// ---------------------------------------------------------------------------

/// Creation request sent to the hospital directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HospitalCreate {
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub creation_batch_id: Option<String>,
}

/// Partial update request for a single hospital
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HospitalUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Hospital entity as reported by the directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hospital {
    pub id: i64,
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub creation_batch_id: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    pub created_at: String,
}

fn default_active() -> bool {
    true
}

/// Directory response to a bulk activation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivateResponse {
    pub activated_count: u64,
    pub message: String,
}

/// Directory response to a bulk deletion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted_count: u64,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Internal batch bookkeeping
// ---------------------------------------------------------------------------

/// Per-row creation outcome held inside a [`BatchRecord`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HospitalRecord {
    /// Source row number, 1-based, stable for error attribution
    pub row: usize,
    /// Directory-assigned identity, present only after a successful create
    pub hospital_id: Option<i64>,
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub status: HospitalStatus,
    pub error_message: Option<String>,
}

/// Mutable state of one batch, keyed by its identity in the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRecord {
    pub batch_id: String,
    pub total_hospitals: usize,
    pub processed_hospitals: usize,
    pub failed_hospitals: usize,
    pub processing_time_seconds: f64,
    pub batch_activated: bool,
    pub processing_status: BatchProcessingStatus,
    /// Ordered by input row, assembled by position rather than completion time
    pub hospitals: Vec<HospitalRecord>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl BatchRecord {
    /// Create a fresh pending record with an empty item sequence
    pub fn new(batch_id: impl Into<String>, total_hospitals: usize) -> Self {
        Self {
            batch_id: batch_id.into(),
            total_hospitals,
            processed_hospitals: 0,
            failed_hospitals: 0,
            processing_time_seconds: 0.0,
            batch_activated: false,
            processing_status: BatchProcessingStatus::Pending,
            hospitals: Vec::new(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Recompute success/failure counts from the authoritative item sequence.
    ///
    /// Counters are never incremented independently by concurrent writers;
    /// every mutation path derives them from `hospitals` so racing item
    /// completions cannot double-count.
    pub fn recompute_counts(&mut self) {
        self.processed_hospitals = self
            .hospitals
            .iter()
            .filter(|h| {
                matches!(
                    h.status,
                    HospitalStatus::Created | HospitalStatus::CreatedAndActivated
                )
            })
            .count();
        self.failed_hospitals = self
            .hospitals
            .iter()
            .filter(|h| h.status == HospitalStatus::Failed)
            .count();
    }

    /// Count of items whose remote entity is known to have disappeared
    pub fn deleted_count(&self) -> usize {
        self.hospitals
            .iter()
            .filter(|h| h.status == HospitalStatus::Deleted)
            .count()
    }
}

// ---------------------------------------------------------------------------
// Client-facing response schemas
// ---------------------------------------------------------------------------

/// Immediate response to a CSV upload; the caller polls with `batch_id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchUploadResponse {
    pub batch_id: String,
    pub total_hospitals: usize,
    pub message: String,
    pub status: BatchProcessingStatus,
}

/// Full batch snapshot, reconciled against the directory once terminal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStatusResponse {
    pub batch_id: String,
    pub total_hospitals: usize,
    pub processed_hospitals: usize,
    pub failed_hospitals: usize,
    pub deleted_hospitals: usize,
    pub batch_activated: bool,
    pub processing_status: BatchProcessingStatus,
    pub hospitals: Vec<HospitalRecord>,
}

/// Cheap local progress snapshot for polling clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchProgressResponse {
    pub batch_id: String,
    pub progress_percentage: f64,
    pub processing_status: BatchProcessingStatus,
    pub processed_hospitals: usize,
    pub total_hospitals: usize,
    pub failed_hospitals: usize,
    pub current_message: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

/// One field-level validation failure, attributed to its location in the input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub loc: Vec<serde_json::Value>,
    pub msg: String,
    #[serde(rename = "type")]
    pub error_type: String,
}

impl ValidationErrorDetail {
    pub fn new(
        loc: Vec<serde_json::Value>,
        msg: impl Into<String>,
        error_type: impl Into<String>,
    ) -> Self {
        Self {
            loc,
            msg: msg.into(),
            error_type: error_type.into(),
        }
    }
}
