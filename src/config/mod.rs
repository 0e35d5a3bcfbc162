//! Configuration management
//!
//! Environment-driven settings with `.env` support via dotenvy.

use crate::utils::error::{Result, ServiceError};
use std::env;
use tracing::debug;

/// Default directory endpoint, overridable via `EXTERNAL_API_BASE_URL`
pub const DEFAULT_EXTERNAL_API_BASE_URL: &str = "https://hospital-directory.onrender.com";

/// Concurrency ceiling for in-flight hospital creations per batch
pub const MAX_CONCURRENT_REQUESTS: usize = 20;

/// Per-call timeout against the directory, in seconds
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Upload size cap for CSV files, in megabytes
pub const CSV_MAX_SIZE_MB: usize = 10;

/// Exact header row a CSV upload must carry, in order
pub const CSV_REQUIRED_HEADERS: [&str; 3] = ["name", "address", "phone"];

/// Runtime settings for the service
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the external hospital directory
    pub external_api_base_url: String,
    /// HTTP bind host
    pub host: String,
    /// HTTP bind port
    pub port: u16,
    /// Concurrency ceiling for the fan-out executor
    pub max_concurrent_requests: usize,
    /// Per-call directory timeout in seconds
    pub request_timeout_secs: u64,
    /// CSV upload size cap in megabytes
    pub csv_max_size_mb: usize,
    /// Log level used when RUST_LOG is not set
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            external_api_base_url: DEFAULT_EXTERNAL_API_BASE_URL.to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_concurrent_requests: MAX_CONCURRENT_REQUESTS,
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            csv_max_size_mb: CSV_MAX_SIZE_MB,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from environment variables, falling back to defaults.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        debug!("Loading configuration from environment variables");

        let mut settings = Self::default();

        if let Ok(base_url) = env::var("EXTERNAL_API_BASE_URL") {
            settings.external_api_base_url = base_url;
        }
        if let Ok(host) = env::var("APP_HOST") {
            settings.host = host;
        }
        if let Ok(port) = env::var("APP_PORT") {
            settings.port = port
                .parse()
                .map_err(|e| ServiceError::Config(format!("Invalid port: {e}")))?;
        }
        if let Ok(level) = env::var("LOG_LEVEL") {
            settings.log_level = level;
        }

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.external_api_base_url.trim().is_empty() {
            return Err(ServiceError::Config(
                "EXTERNAL_API_BASE_URL must not be empty".to_string(),
            ));
        }
        if self.max_concurrent_requests == 0 {
            return Err(ServiceError::Config(
                "max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
