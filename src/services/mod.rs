//! Services module
//!
//! External collaborators consumed by the core orchestration logic.

pub mod directory;

pub use directory::{DirectoryError, HospitalDirectory, HttpHospitalDirectory};
