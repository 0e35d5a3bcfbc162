//! Application state shared across HTTP handlers

use crate::config::Settings;
use crate::core::orchestrator::BatchOrchestrator;
use std::sync::Arc;

/// HTTP server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Runtime settings (shared read-only)
    pub settings: Arc<Settings>,
    /// Batch orchestration engine
    pub orchestrator: Arc<BatchOrchestrator>,
}

impl AppState {
    pub fn new(settings: Settings, orchestrator: BatchOrchestrator) -> Self {
        Self {
            settings: Arc::new(settings),
            orchestrator: Arc::new(orchestrator),
        }
    }
}
