//! Utility modules for the batch processor

pub mod csv;
pub mod error;

pub use error::{Result, ServiceError};
