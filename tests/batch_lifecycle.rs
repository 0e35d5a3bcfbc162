//! End-to-end orchestrator tests against an instrumented in-memory directory

use async_trait::async_trait;
use hospital_batch_rs::core::models::{
    ActivateResponse, BatchProcessingStatus, DeleteResponse, Hospital, HospitalCreate,
    HospitalStatus, HospitalUpdate, ParsedRow,
};
use hospital_batch_rs::core::orchestrator::BatchOrchestrator;
use hospital_batch_rs::core::store::BatchStore;
use hospital_batch_rs::services::directory::{DirectoryError, HospitalDirectory};
use hospital_batch_rs::utils::error::ServiceError;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// In-memory directory that records call patterns and concurrency
struct FakeDirectory {
    next_id: AtomicI64,
    /// Hospitals the remote system currently knows about
    remote: Mutex<Vec<Hospital>>,
    /// Names whose creation should be rejected
    fail_names: Vec<String>,
    /// Per-name artificial latency for create calls
    create_delays: HashMap<String, u64>,
    /// Base latency applied to every create call
    base_delay_ms: u64,
    /// When false, activate_batch reports zero activations
    activation_enabled: bool,
    /// When true, listing by batch fails with a transport error
    listing_fails: bool,
    activate_calls: AtomicUsize,
    list_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeDirectory {
    fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            remote: Mutex::new(Vec::new()),
            fail_names: Vec::new(),
            create_delays: HashMap::new(),
            base_delay_ms: 0,
            activation_enabled: true,
            listing_fails: false,
            activate_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    fn failing_for(mut self, names: &[&str]) -> Self {
        self.fail_names = names.iter().map(|n| n.to_string()).collect();
        self
    }

    fn with_base_delay(mut self, ms: u64) -> Self {
        self.base_delay_ms = ms;
        self
    }

    fn with_delay_for(mut self, name: &str, ms: u64) -> Self {
        self.create_delays.insert(name.to_string(), ms);
        self
    }

    fn without_activation(mut self) -> Self {
        self.activation_enabled = false;
        self
    }

    fn with_failing_listing(mut self) -> Self {
        self.listing_fails = true;
        self
    }

    async fn remove_remote(&self, hospital_id: i64) {
        self.remote.lock().await.retain(|h| h.id != hospital_id);
    }

    async fn deactivate_remote(&self, hospital_id: i64) {
        for hospital in self.remote.lock().await.iter_mut() {
            if hospital.id == hospital_id {
                hospital.active = false;
            }
        }
    }
}

#[async_trait]
impl HospitalDirectory for FakeDirectory {
    async fn create_hospital(
        &self,
        hospital: &HospitalCreate,
    ) -> Result<Hospital, DirectoryError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = self
            .create_delays
            .get(&hospital.name)
            .copied()
            .unwrap_or(self.base_delay_ms);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_names.contains(&hospital.name) {
            return Err(DirectoryError::Rejected {
                status: 422,
                message: format!("directory refused {}", hospital.name),
            });
        }

        let created = Hospital {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            name: hospital.name.clone(),
            address: hospital.address.clone(),
            phone: hospital.phone.clone(),
            creation_batch_id: hospital.creation_batch_id.clone(),
            active: false,
            created_at: "2024-01-01T00:00:00Z".to_string(),
        };
        self.remote.lock().await.push(created.clone());
        Ok(created)
    }

    async fn get_hospital(&self, hospital_id: i64) -> Result<Hospital, DirectoryError> {
        self.remote
            .lock()
            .await
            .iter()
            .find(|h| h.id == hospital_id)
            .cloned()
            .ok_or(DirectoryError::Rejected {
                status: 404,
                message: "not found".to_string(),
            })
    }

    async fn get_hospitals_by_batch(
        &self,
        batch_id: &str,
    ) -> Result<Vec<Hospital>, DirectoryError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.listing_fails {
            return Err(DirectoryError::Transport("connection refused".to_string()));
        }
        Ok(self
            .remote
            .lock()
            .await
            .iter()
            .filter(|h| h.creation_batch_id.as_deref() == Some(batch_id))
            .cloned()
            .collect())
    }

    async fn activate_batch(&self, batch_id: &str) -> Result<ActivateResponse, DirectoryError> {
        self.activate_calls.fetch_add(1, Ordering::SeqCst);
        if !self.activation_enabled {
            return Ok(ActivateResponse {
                activated_count: 0,
                message: "nothing activated".to_string(),
            });
        }
        let mut activated = 0;
        for hospital in self.remote.lock().await.iter_mut() {
            if hospital.creation_batch_id.as_deref() == Some(batch_id) {
                hospital.active = true;
                activated += 1;
            }
        }
        Ok(ActivateResponse {
            activated_count: activated,
            message: format!("{activated} hospitals activated"),
        })
    }

    async fn update_hospital(
        &self,
        hospital_id: i64,
        update: &HospitalUpdate,
    ) -> Result<Hospital, DirectoryError> {
        let mut remote = self.remote.lock().await;
        let hospital = remote
            .iter_mut()
            .find(|h| h.id == hospital_id)
            .ok_or(DirectoryError::Rejected {
                status: 404,
                message: "not found".to_string(),
            })?;
        if let Some(name) = &update.name {
            hospital.name = name.clone();
        }
        if let Some(address) = &update.address {
            hospital.address = address.clone();
        }
        Ok(hospital.clone())
    }

    async fn delete_hospital(&self, hospital_id: i64) -> Result<(), DirectoryError> {
        self.remove_remote(hospital_id).await;
        Ok(())
    }

    async fn delete_batch(&self, batch_id: &str) -> Result<DeleteResponse, DirectoryError> {
        let mut remote = self.remote.lock().await;
        let before = remote.len();
        remote.retain(|h| h.creation_batch_id.as_deref() != Some(batch_id));
        Ok(DeleteResponse {
            deleted_count: (before - remote.len()) as u64,
            message: "deleted".to_string(),
        })
    }
}

fn rows(names: &[&str]) -> Vec<ParsedRow> {
    names
        .iter()
        .map(|name| ParsedRow {
            name: name.to_string(),
            address: format!("{name} street"),
            phone: None,
        })
        .collect()
}

fn orchestrator_with(directory: Arc<FakeDirectory>, max_concurrency: usize) -> BatchOrchestrator {
    BatchOrchestrator::new(Arc::new(BatchStore::new()), directory, max_concurrency)
}

async fn wait_until_terminal(orchestrator: &BatchOrchestrator, batch_id: &str) {
    for _ in 0..500 {
        let progress = orchestrator
            .get_progress(batch_id)
            .expect("batch should exist");
        if progress.processing_status.is_terminal() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("batch {batch_id} never reached a terminal status");
}

#[tokio::test]
async fn all_rows_succeed_and_activate() {
    let directory = Arc::new(FakeDirectory::new());
    let orchestrator = orchestrator_with(Arc::clone(&directory), 20);

    let upload = orchestrator.submit(rows(&["a", "b", "c"]));
    assert_eq!(upload.total_hospitals, 3);
    assert_eq!(upload.status, BatchProcessingStatus::Pending);

    wait_until_terminal(&orchestrator, &upload.batch_id).await;
    let status = orchestrator.get_status(&upload.batch_id).await.unwrap();

    assert_eq!(status.processing_status, BatchProcessingStatus::Completed);
    assert!(status.batch_activated);
    assert_eq!(status.processed_hospitals, 3);
    assert_eq!(status.failed_hospitals, 0);
    assert_eq!(status.deleted_hospitals, 0);
    assert!(
        status
            .hospitals
            .iter()
            .all(|h| h.status == HospitalStatus::CreatedAndActivated)
    );
    assert_eq!(directory.activate_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn partial_failure_yields_partially_completed() {
    let directory = Arc::new(FakeDirectory::new().failing_for(&["b"]));
    let orchestrator = orchestrator_with(Arc::clone(&directory), 20);

    let upload = orchestrator.submit(rows(&["a", "b", "c"]));
    wait_until_terminal(&orchestrator, &upload.batch_id).await;
    let status = orchestrator.get_status(&upload.batch_id).await.unwrap();

    assert_eq!(
        status.processing_status,
        BatchProcessingStatus::PartiallyCompleted
    );
    assert_eq!(status.failed_hospitals, 1);
    assert_eq!(status.processed_hospitals, 2);

    let failed = &status.hospitals[1];
    assert_eq!(failed.row, 2);
    assert_eq!(failed.status, HospitalStatus::Failed);
    assert_eq!(failed.name, "b");
    assert!(failed.hospital_id.is_none());
    assert!(!failed.error_message.as_deref().unwrap_or_default().is_empty());
}

#[tokio::test]
async fn total_failure_skips_activation() {
    let directory = Arc::new(FakeDirectory::new().failing_for(&["a", "b"]));
    let orchestrator = orchestrator_with(Arc::clone(&directory), 20);

    let upload = orchestrator.submit(rows(&["a", "b"]));
    wait_until_terminal(&orchestrator, &upload.batch_id).await;
    let status = orchestrator.get_status(&upload.batch_id).await.unwrap();

    assert_eq!(status.processing_status, BatchProcessingStatus::Failed);
    assert!(!status.batch_activated);
    assert_eq!(status.failed_hospitals, 2);
    assert_eq!(directory.activate_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn zero_activations_leaves_batch_unactivated() {
    let directory = Arc::new(FakeDirectory::new().without_activation());
    let orchestrator = orchestrator_with(Arc::clone(&directory), 20);

    let upload = orchestrator.submit(rows(&["a"]));
    wait_until_terminal(&orchestrator, &upload.batch_id).await;
    let progress = orchestrator.get_progress(&upload.batch_id).unwrap();

    assert_eq!(progress.processing_status, BatchProcessingStatus::Completed);
    let record = orchestrator.get_status(&upload.batch_id).await.unwrap();
    assert!(!record.batch_activated);
    assert_eq!(directory.activate_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn reconciliation_marks_remotely_deleted_hospitals() {
    let directory = Arc::new(FakeDirectory::new());
    let orchestrator = orchestrator_with(Arc::clone(&directory), 20);

    let upload = orchestrator.submit(rows(&["a", "b", "c"]));
    wait_until_terminal(&orchestrator, &upload.batch_id).await;

    let status = orchestrator.get_status(&upload.batch_id).await.unwrap();
    let victim = status.hospitals[1].hospital_id.unwrap();
    directory.remove_remote(victim).await;

    let status = orchestrator.get_status(&upload.batch_id).await.unwrap();
    assert_eq!(status.deleted_hospitals, 1);
    assert_eq!(status.hospitals[1].status, HospitalStatus::Deleted);

    // A repeat query reports the same count; already-deleted items stay put.
    let status = orchestrator.get_status(&upload.batch_id).await.unwrap();
    assert_eq!(status.deleted_hospitals, 1);
    assert_eq!(status.hospitals[1].status, HospitalStatus::Deleted);
}

#[tokio::test]
async fn reconciliation_downgrades_inactive_hospitals() {
    let directory = Arc::new(FakeDirectory::new());
    let orchestrator = orchestrator_with(Arc::clone(&directory), 20);

    let upload = orchestrator.submit(rows(&["a", "b"]));
    wait_until_terminal(&orchestrator, &upload.batch_id).await;

    let status = orchestrator.get_status(&upload.batch_id).await.unwrap();
    let target = status.hospitals[0].hospital_id.unwrap();
    directory.deactivate_remote(target).await;

    let status = orchestrator.get_status(&upload.batch_id).await.unwrap();
    assert_eq!(status.hospitals[0].status, HospitalStatus::Created);
    assert_eq!(
        status.hospitals[1].status,
        HospitalStatus::CreatedAndActivated
    );
}

#[tokio::test]
async fn reconciliation_failure_degrades_to_empty_listing() {
    let directory = Arc::new(FakeDirectory::new().with_failing_listing());
    let orchestrator = orchestrator_with(Arc::clone(&directory), 20);

    let upload = orchestrator.submit(rows(&["a", "b"]));
    wait_until_terminal(&orchestrator, &upload.batch_id).await;

    // Listing failure means nothing is confirmed: every created hospital
    // counts as deleted for this read, and no error reaches the caller.
    let status = orchestrator.get_status(&upload.batch_id).await.unwrap();
    assert_eq!(status.deleted_hospitals, 2);
}

#[tokio::test]
async fn unknown_batch_is_not_found() {
    let orchestrator = orchestrator_with(Arc::new(FakeDirectory::new()), 20);

    let status = orchestrator.get_status("nope").await;
    assert!(matches!(status, Err(ServiceError::BatchNotFound(_))));

    let progress = orchestrator.get_progress("nope");
    assert!(matches!(progress, Err(ServiceError::BatchNotFound(_))));
}

#[tokio::test]
async fn empty_batch_completes_with_zero_percentage() {
    let directory = Arc::new(FakeDirectory::new());
    let orchestrator = orchestrator_with(Arc::clone(&directory), 20);

    let upload = orchestrator.submit(Vec::new());
    wait_until_terminal(&orchestrator, &upload.batch_id).await;

    let progress = orchestrator.get_progress(&upload.batch_id).unwrap();
    assert_eq!(progress.progress_percentage, 0.0);
    assert_eq!(progress.processing_status, BatchProcessingStatus::Completed);
    assert_eq!(directory.activate_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn item_order_matches_input_despite_completion_order() {
    // First row finishes last; stored sequence must still follow input order.
    let directory = Arc::new(
        FakeDirectory::new()
            .with_delay_for("a", 50)
            .with_delay_for("b", 20)
            .with_delay_for("c", 1),
    );
    let orchestrator = orchestrator_with(Arc::clone(&directory), 20);

    let upload = orchestrator.submit(rows(&["a", "b", "c"]));
    wait_until_terminal(&orchestrator, &upload.batch_id).await;
    let status = orchestrator.get_status(&upload.batch_id).await.unwrap();

    let names: Vec<&str> = status.hospitals.iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    let row_numbers: Vec<usize> = status.hospitals.iter().map(|h| h.row).collect();
    assert_eq!(row_numbers, vec![1, 2, 3]);
}

#[tokio::test]
async fn concurrency_stays_under_the_ceiling() {
    let directory = Arc::new(FakeDirectory::new().with_base_delay(10));
    let orchestrator = orchestrator_with(Arc::clone(&directory), 5);

    let names: Vec<String> = (0..40).map(|i| format!("h{i}")).collect();
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let upload = orchestrator.submit(rows(&name_refs));
    wait_until_terminal(&orchestrator, &upload.batch_id).await;

    assert!(directory.peak_in_flight.load(Ordering::SeqCst) <= 5);
    let status = orchestrator.get_status(&upload.batch_id).await.unwrap();
    assert_eq!(status.processed_hospitals, 40);
}

#[tokio::test]
async fn progress_is_monotonic_and_never_calls_the_directory() {
    let directory = Arc::new(FakeDirectory::new().with_base_delay(15));
    let orchestrator = orchestrator_with(Arc::clone(&directory), 2);

    let upload = orchestrator.submit(rows(&["a", "b", "c", "d", "e", "f"]));

    let mut last_processed = 0;
    loop {
        let progress = orchestrator.get_progress(&upload.batch_id).unwrap();
        let processed = progress.processed_hospitals;
        assert!(processed >= last_processed, "progress went backwards");
        assert!(processed <= progress.total_hospitals);
        last_processed = processed;
        if progress.processing_status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert_eq!(last_processed, 6);
    // get_progress is a local read; reconciliation belongs to get_status only.
    assert_eq!(directory.list_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn status_on_non_terminal_batch_skips_reconciliation() {
    let directory = Arc::new(FakeDirectory::new().with_base_delay(100));
    let orchestrator = orchestrator_with(Arc::clone(&directory), 1);

    let upload = orchestrator.submit(rows(&["a", "b", "c"]));

    // Query while the batch is still pending or processing.
    let status = orchestrator.get_status(&upload.batch_id).await.unwrap();
    assert!(!status.processing_status.is_terminal());
    assert_eq!(directory.list_calls.load(Ordering::SeqCst), 0);

    wait_until_terminal(&orchestrator, &upload.batch_id).await;
    orchestrator.get_status(&upload.batch_id).await.unwrap();
    assert_eq!(directory.list_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn completed_batch_reports_full_progress() {
    let directory = Arc::new(FakeDirectory::new().with_base_delay(20));
    let orchestrator = orchestrator_with(Arc::clone(&directory), 20);

    let upload = orchestrator.submit(rows(&["a"]));
    wait_until_terminal(&orchestrator, &upload.batch_id).await;

    let progress = orchestrator.get_progress(&upload.batch_id).unwrap();
    assert_eq!(progress.progress_percentage, 100.0);
    assert_eq!(progress.current_message, "All hospitals processed successfully");
}
