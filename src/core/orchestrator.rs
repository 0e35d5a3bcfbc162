//! Batch lifecycle orchestration
//!
//! Owns the batch state machine: submission fans work out under the
//! concurrency cap, per-item outcomes accumulate in the store while creation
//! is in flight, a best-effort bulk activation runs at the end, and status
//! queries on finished batches reconcile local records against the
//! directory's current truth.

use crate::core::executor;
use crate::core::models::{
    BatchProcessingStatus, BatchProgressResponse, BatchRecord, BatchStatusResponse,
    BatchUploadResponse, Hospital, HospitalCreate, HospitalRecord, HospitalStatus, ParsedRow,
};
use crate::core::store::BatchStore;
use crate::services::directory::HospitalDirectory;
use crate::utils::error::{Result, ServiceError};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Drives batches from submission to a terminal status
#[derive(Clone)]
pub struct BatchOrchestrator {
    store: Arc<BatchStore>,
    directory: Arc<dyn HospitalDirectory>,
    max_concurrency: usize,
}

impl BatchOrchestrator {
    pub fn new(
        store: Arc<BatchStore>,
        directory: Arc<dyn HospitalDirectory>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            store,
            directory,
            max_concurrency,
        }
    }

    /// Register a batch and kick off its creation phase in the background.
    ///
    /// Returns immediately; the caller polls `get_progress`/`get_status` with
    /// the returned batch identity.
    pub fn submit(&self, rows: Vec<ParsedRow>) -> BatchUploadResponse {
        let batch_id = Uuid::new_v4().to_string();
        let total = rows.len();

        self.store.save(BatchRecord::new(batch_id.clone(), total));
        info!(batch_id = %batch_id, total, "Batch submitted");

        let orchestrator = self.clone();
        let task_batch_id = batch_id.clone();
        tokio::spawn(async move {
            orchestrator.run_creation_phase(&task_batch_id, rows).await;
        });

        BatchUploadResponse {
            batch_id,
            total_hospitals: total,
            message: "CSV upload initiated. Use batch_id to track progress.".to_string(),
            status: BatchProcessingStatus::Pending,
        }
    }

    /// Creation phase: fan out, aggregate, activate, seal a terminal status
    async fn run_creation_phase(&self, batch_id: &str, rows: Vec<ParsedRow>) {
        let started = Instant::now();

        self.store.with_mut(batch_id, |batch| {
            batch.processing_status = BatchProcessingStatus::Processing;
            batch.started_at = Some(Utc::now());
        });

        // Kept aside so a task that dies without producing a record can still
        // be attributed to its source row.
        let fallback_rows = rows.clone();

        let orchestrator = self.clone();
        let task_batch_id = batch_id.to_string();
        let results = executor::run_bounded(rows, self.max_concurrency, move |index, row| {
            let orchestrator = orchestrator.clone();
            let batch_id = task_batch_id.clone();
            async move { orchestrator.create_from_row(&batch_id, index + 1, row).await }
        })
        .await;

        let records: Vec<HospitalRecord> = results
            .into_iter()
            .enumerate()
            .map(|(index, result)| {
                result.unwrap_or_else(|message| {
                    let row = &fallback_rows[index];
                    HospitalRecord {
                        row: index + 1,
                        hospital_id: None,
                        name: row.name.clone(),
                        address: row.address.clone(),
                        phone: row.phone.clone(),
                        status: HospitalStatus::Failed,
                        error_message: Some(message),
                    }
                })
            })
            .collect();

        let processed = self
            .store
            .with_mut(batch_id, |batch| {
                batch.hospitals = records;
                batch.recompute_counts();
                batch.processed_hospitals
            })
            .unwrap_or(0);

        let mut batch_activated = false;
        if processed > 0 {
            match self.directory.activate_batch(batch_id).await {
                Ok(activation) if activation.activated_count > 0 => {
                    batch_activated = true;
                }
                Ok(activation) => {
                    warn!(batch_id, activated = activation.activated_count, "Activation reported no hospitals");
                }
                Err(e) => {
                    warn!(batch_id, error = %e, "Batch activation failed, proceeding unactivated");
                }
            }
        }

        let elapsed = round2(started.elapsed().as_secs_f64());
        self.store.with_mut(batch_id, |batch| {
            if batch_activated {
                batch.batch_activated = true;
                for hospital in &mut batch.hospitals {
                    if hospital.status == HospitalStatus::Created {
                        hospital.status = HospitalStatus::CreatedAndActivated;
                    }
                }
            }
            batch.recompute_counts();
            batch.processing_status = if batch.failed_hospitals == 0 {
                BatchProcessingStatus::Completed
            } else if batch.processed_hospitals > 0 {
                BatchProcessingStatus::PartiallyCompleted
            } else {
                BatchProcessingStatus::Failed
            };
            batch.completed_at = Some(Utc::now());
            batch.processing_time_seconds = elapsed;
            info!(
                batch_id,
                status = ?batch.processing_status,
                processed = batch.processed_hospitals,
                failed = batch.failed_hospitals,
                seconds = batch.processing_time_seconds,
                "Batch finished"
            );
        });
    }

    /// Create one hospital from its input row and record the outcome.
    ///
    /// Never fails the phase: any directory error becomes a `Failed` record
    /// carrying the error text. The record is written into the batch at its
    /// row position as soon as it resolves, so mid-flight progress queries
    /// see live counts.
    async fn create_from_row(
        &self,
        batch_id: &str,
        row_number: usize,
        row: ParsedRow,
    ) -> HospitalRecord {
        let request = HospitalCreate {
            name: row.name.clone(),
            address: row.address.clone(),
            phone: row.phone.clone(),
            creation_batch_id: Some(batch_id.to_string()),
        };

        let record = match self.directory.create_hospital(&request).await {
            Ok(hospital) => HospitalRecord {
                row: row_number,
                hospital_id: Some(hospital.id),
                name: hospital.name,
                address: hospital.address,
                phone: hospital.phone,
                status: HospitalStatus::Created,
                error_message: None,
            },
            Err(e) => HospitalRecord {
                row: row_number,
                hospital_id: None,
                name: row.name,
                address: row.address,
                phone: row.phone,
                status: HospitalStatus::Failed,
                error_message: Some(e.to_string()),
            },
        };

        self.store.with_mut(batch_id, |batch| {
            let position = batch.hospitals.partition_point(|h| h.row < record.row);
            batch.hospitals.insert(position, record.clone());
            batch.recompute_counts();
        });

        record
    }

    /// Full batch snapshot, reconciled against the directory once the batch
    /// has finished with at least one success.
    pub async fn get_status(&self, batch_id: &str) -> Result<BatchStatusResponse> {
        let snapshot = self
            .store
            .get(batch_id)
            .ok_or_else(|| ServiceError::BatchNotFound(batch_id.to_string()))?;

        let deleted_hospitals = if snapshot.processing_status.is_success_bearing() {
            self.reconcile(batch_id).await
        } else {
            snapshot.deleted_count()
        };

        let batch = self
            .store
            .get(batch_id)
            .ok_or_else(|| ServiceError::BatchNotFound(batch_id.to_string()))?;

        Ok(BatchStatusResponse {
            batch_id: batch.batch_id,
            total_hospitals: batch.total_hospitals,
            processed_hospitals: batch.processed_hospitals,
            failed_hospitals: batch.failed_hospitals,
            deleted_hospitals,
            batch_activated: batch.batch_activated,
            processing_status: batch.processing_status,
            hospitals: batch.hospitals,
        })
    }

    /// Re-derive item statuses from the directory's current truth.
    ///
    /// A directory failure degrades to an empty listing: nothing is
    /// confirmed, every recorded hospital counts as deleted for this read,
    /// and the error never reaches the caller.
    async fn reconcile(&self, batch_id: &str) -> usize {
        let remote = match self.directory.get_hospitals_by_batch(batch_id).await {
            Ok(hospitals) => hospitals,
            Err(e) => {
                warn!(batch_id, error = %e, "Reconciliation listing failed, treating as empty");
                Vec::new()
            }
        };
        let remote_by_id: HashMap<i64, Hospital> =
            remote.into_iter().map(|h| (h.id, h)).collect();

        self.store
            .with_mut(batch_id, |batch| {
                for hospital in &mut batch.hospitals {
                    let Some(hospital_id) = hospital.hospital_id else {
                        continue;
                    };
                    match remote_by_id.get(&hospital_id) {
                        None => {
                            if hospital.status != HospitalStatus::Deleted {
                                hospital.status = HospitalStatus::Deleted;
                            }
                        }
                        Some(remote) if remote.active => {
                            if hospital.status != HospitalStatus::Deleted {
                                hospital.status = HospitalStatus::CreatedAndActivated;
                            }
                        }
                        Some(_) => {
                            if hospital.status != HospitalStatus::Deleted
                                && hospital.status != HospitalStatus::Failed
                            {
                                hospital.status = HospitalStatus::Created;
                            }
                        }
                    }
                }
                batch.deleted_count()
            })
            .unwrap_or(0)
    }

    /// Cheap local progress read; never touches the directory
    pub fn get_progress(&self, batch_id: &str) -> Result<BatchProgressResponse> {
        let batch = self
            .store
            .get(batch_id)
            .ok_or_else(|| ServiceError::BatchNotFound(batch_id.to_string()))?;

        let total = batch.total_hospitals;
        let processed = batch.processed_hospitals + batch.failed_hospitals;
        let progress_percentage = if total > 0 {
            round2(processed as f64 / total as f64 * 100.0)
        } else {
            0.0
        };

        let current_message = match batch.processing_status {
            BatchProcessingStatus::Pending => "Batch processing queued".to_string(),
            BatchProcessingStatus::Processing => {
                format!("Processing hospital {processed}/{total}")
            }
            BatchProcessingStatus::Completed => {
                "All hospitals processed successfully".to_string()
            }
            BatchProcessingStatus::PartiallyCompleted => {
                format!("Completed with {} failures", batch.failed_hospitals)
            }
            BatchProcessingStatus::Failed => "Processing failed".to_string(),
        };

        Ok(BatchProgressResponse {
            batch_id: batch.batch_id,
            progress_percentage,
            processing_status: batch.processing_status,
            processed_hospitals: processed,
            total_hospitals: total,
            failed_hospitals: batch.failed_hospitals,
            current_message,
        })
    }
}
