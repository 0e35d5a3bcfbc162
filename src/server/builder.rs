//! Server construction and the run_server entry point

use crate::config::Settings;
use crate::core::orchestrator::BatchOrchestrator;
use crate::core::store::BatchStore;
use crate::server::routes;
use crate::server::state::AppState;
use crate::services::directory::HttpHospitalDirectory;
use crate::utils::error::Result;
use actix_cors::Cors;
use actix_web::{App, HttpServer as ActixHttpServer, middleware::Logger, web};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// HTTP server for the batch processor
pub struct HttpServer {
    settings: Settings,
    state: AppState,
}

impl HttpServer {
    /// Wire up the store, directory client, and orchestrator
    pub fn new(settings: Settings) -> Result<Self> {
        info!("Creating HTTP server");

        let directory = HttpHospitalDirectory::new(
            settings.external_api_base_url.clone(),
            Duration::from_secs(settings.request_timeout_secs),
        )?;
        let store = Arc::new(BatchStore::new());
        let orchestrator = BatchOrchestrator::new(
            store,
            Arc::new(directory),
            settings.max_concurrent_requests,
        );

        let state = AppState::new(settings.clone(), orchestrator);
        Ok(Self { settings, state })
    }

    /// Bind and serve until shutdown
    pub async fn start(self) -> Result<()> {
        let state = web::Data::new(self.state);
        let bind_addr = (self.settings.host.clone(), self.settings.port);

        ActixHttpServer::new(move || {
            App::new()
                .wrap(Logger::default())
                .wrap(Cors::permissive())
                .app_data(state.clone())
                .configure(routes::configure)
        })
        .bind(bind_addr)?
        .run()
        .await?;

        Ok(())
    }
}

/// Run the server with settings loaded from the environment
pub async fn run_server() -> Result<()> {
    info!("Starting hospital batch processor");

    let settings = Settings::from_env()?;
    info!(
        "Server starting at: http://{}:{}",
        settings.host, settings.port
    );
    info!("API Endpoints:");
    info!("   GET  /health - Health check");
    info!("   POST /batch/upload-csv - Upload CSV and initiate creation");
    info!("   GET  /batch/{{batch_id}}/status - Batch status");
    info!("   GET  /batch/{{batch_id}}/progress - Batch progress (polling)");

    HttpServer::new(settings)?.start().await
}
