//! Hospital directory client
//!
//! Capability contract consumed by the batch orchestrator plus the HTTP
//! implementation against the external hospital directory service. Every
//! operation is independently fallible and non-retrying; retry and
//! degradation policy belong to the caller.

use crate::core::models::{
    ActivateResponse, DeleteResponse, Hospital, HospitalCreate, HospitalUpdate,
};
use crate::utils::error::{Result, ServiceError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Failure reasons at the directory boundary.
///
/// The orchestrator collapses all of these into a generic item failure; the
/// distinction exists so callers can tell timeout from rejection when they
/// need to.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("directory request timed out")]
    Timeout,

    #[error("directory transport error: {0}")]
    Transport(String),

    #[error("rejected by directory (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Operations the hospital directory exposes to this service
#[async_trait]
pub trait HospitalDirectory: Send + Sync {
    /// Create a single hospital, tagged with its batch identity
    async fn create_hospital(
        &self,
        hospital: &HospitalCreate,
    ) -> std::result::Result<Hospital, DirectoryError>;

    /// Fetch a single hospital by its directory identity
    async fn get_hospital(&self, hospital_id: i64)
    -> std::result::Result<Hospital, DirectoryError>;

    /// List every hospital tagged with the given batch identity
    async fn get_hospitals_by_batch(
        &self,
        batch_id: &str,
    ) -> std::result::Result<Vec<Hospital>, DirectoryError>;

    /// Activate all hospitals in a batch; reports how many were activated
    async fn activate_batch(
        &self,
        batch_id: &str,
    ) -> std::result::Result<ActivateResponse, DirectoryError>;

    /// Update fields of a single hospital
    async fn update_hospital(
        &self,
        hospital_id: i64,
        update: &HospitalUpdate,
    ) -> std::result::Result<Hospital, DirectoryError>;

    /// Delete a single hospital
    async fn delete_hospital(&self, hospital_id: i64) -> std::result::Result<(), DirectoryError>;

    /// Delete every hospital in a batch
    async fn delete_batch(
        &self,
        batch_id: &str,
    ) -> std::result::Result<DeleteResponse, DirectoryError>;
}

/// HTTP client for the hospital directory REST API
#[derive(Debug, Clone)]
pub struct HttpHospitalDirectory {
    base_url: String,
    client: reqwest::Client,
}

impl HttpHospitalDirectory {
    /// Build a client with a fixed per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn map_transport(e: reqwest::Error) -> DirectoryError {
        if e.is_timeout() {
            DirectoryError::Timeout
        } else {
            DirectoryError::Transport(e.to_string())
        }
    }

    /// Turn a non-success response into `Rejected`, otherwise decode the body
    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> std::result::Result<T, DirectoryError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DirectoryError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        response.json::<T>().await.map_err(Self::map_transport)
    }
}

#[async_trait]
impl HospitalDirectory for HttpHospitalDirectory {
    async fn create_hospital(
        &self,
        hospital: &HospitalCreate,
    ) -> std::result::Result<Hospital, DirectoryError> {
        debug!(name = %hospital.name, "Creating hospital in directory");
        let response = self
            .client
            .post(self.url("/hospitals/"))
            .json(hospital)
            .send()
            .await
            .map_err(Self::map_transport)?;
        Self::decode(response).await
    }

    async fn get_hospital(
        &self,
        hospital_id: i64,
    ) -> std::result::Result<Hospital, DirectoryError> {
        let response = self
            .client
            .get(self.url(&format!("/hospitals/{hospital_id}")))
            .send()
            .await
            .map_err(Self::map_transport)?;
        Self::decode(response).await
    }

    async fn get_hospitals_by_batch(
        &self,
        batch_id: &str,
    ) -> std::result::Result<Vec<Hospital>, DirectoryError> {
        debug!(batch_id, "Listing hospitals by batch");
        let response = self
            .client
            .get(self.url(&format!("/hospitals/batch/{batch_id}")))
            .send()
            .await
            .map_err(Self::map_transport)?;
        Self::decode(response).await
    }

    async fn activate_batch(
        &self,
        batch_id: &str,
    ) -> std::result::Result<ActivateResponse, DirectoryError> {
        debug!(batch_id, "Activating batch in directory");
        let response = self
            .client
            .patch(self.url(&format!("/hospitals/batch/{batch_id}/activate")))
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(Self::map_transport)?;
        Self::decode(response).await
    }

    async fn update_hospital(
        &self,
        hospital_id: i64,
        update: &HospitalUpdate,
    ) -> std::result::Result<Hospital, DirectoryError> {
        let response = self
            .client
            .put(self.url(&format!("/hospitals/{hospital_id}")))
            .json(update)
            .send()
            .await
            .map_err(Self::map_transport)?;
        Self::decode(response).await
    }

    async fn delete_hospital(&self, hospital_id: i64) -> std::result::Result<(), DirectoryError> {
        let response = self
            .client
            .delete(self.url(&format!("/hospitals/{hospital_id}")))
            .send()
            .await
            .map_err(Self::map_transport)?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DirectoryError::Rejected {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            })
        }
    }

    async fn delete_batch(
        &self,
        batch_id: &str,
    ) -> std::result::Result<DeleteResponse, DirectoryError> {
        let response = self
            .client
            .delete(self.url(&format!("/hospitals/batch/{batch_id}")))
            .send()
            .await
            .map_err(Self::map_transport)?;
        Self::decode(response).await
    }
}
