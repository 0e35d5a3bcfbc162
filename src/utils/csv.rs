//! CSV upload validation and parsing
//!
//! Validates the raw upload (encoding, size, exact headers) and each data
//! row, accumulating field-attributed errors instead of stopping at the
//! first. Row numbers in error locations count the header as row 1, matching
//! what a user sees in a spreadsheet.

use crate::config::{CSV_REQUIRED_HEADERS, Settings};
use crate::core::models::{ParsedRow, ValidationErrorDetail};
use crate::utils::error::{Result, ServiceError};

/// CSV file validator
pub struct CsvValidator {
    max_size_mb: usize,
}

impl CsvValidator {
    pub fn new(settings: &Settings) -> Self {
        Self {
            max_size_mb: settings.csv_max_size_mb,
        }
    }

    /// Validate the upload and parse it into submission-ready rows.
    ///
    /// Fails with `ServiceError::CsvValidation` carrying every detected
    /// problem; returns rows only when the whole file is clean.
    pub fn validate_and_parse(&self, content: &[u8]) -> Result<Vec<ParsedRow>> {
        let size_mb = content.len() as f64 / (1024.0 * 1024.0);
        if size_mb > self.max_size_mb as f64 {
            return Err(ServiceError::CsvValidation(vec![
                ValidationErrorDetail::new(
                    vec!["file".into(), "size".into()],
                    format!("File size exceeds {}MB limit", self.max_size_mb),
                    "file_size_error",
                ),
            ]));
        }

        let decoded = std::str::from_utf8(content).map_err(|_| {
            ServiceError::CsvValidation(vec![ValidationErrorDetail::new(
                vec!["file".into(), "encoding".into()],
                "File must be UTF-8 encoded",
                "encoding_error",
            )])
        })?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(decoded.as_bytes());

        let headers = reader.headers().map_err(|e| {
            ServiceError::CsvValidation(vec![ValidationErrorDetail::new(
                vec!["file".into(), "headers".into()],
                format!("CSV file could not be parsed: {e}"),
                "parse_error",
            )])
        })?;

        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            return Err(ServiceError::CsvValidation(vec![
                ValidationErrorDetail::new(
                    vec!["file".into(), "headers".into()],
                    "CSV file has no headers",
                    "missing_headers",
                ),
            ]));
        }

        if headers.iter().collect::<Vec<_>>() != CSV_REQUIRED_HEADERS {
            return Err(ServiceError::CsvValidation(vec![
                ValidationErrorDetail::new(
                    vec!["file".into(), "headers".into()],
                    format!(
                        "CSV headers must be exactly: {} (case-sensitive)",
                        CSV_REQUIRED_HEADERS.join(",")
                    ),
                    "invalid_headers",
                ),
            ]));
        }

        let mut errors = Vec::new();
        let mut rows = Vec::new();
        // Header occupies file row 1; first data row is 2.
        let mut row_number = 1usize;

        for record in reader.records() {
            row_number += 1;
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    errors.push(ValidationErrorDetail::new(
                        vec!["row".into(), row_number.into()],
                        format!("Malformed CSV row: {e}"),
                        "parse_error",
                    ));
                    continue;
                }
            };

            let name = record.get(0).unwrap_or_default().trim().to_string();
            let address = record.get(1).unwrap_or_default().trim().to_string();
            let phone = record.get(2).map(str::trim).filter(|p| !p.is_empty());

            let mut row_valid = true;
            if name.is_empty() {
                errors.push(ValidationErrorDetail::new(
                    vec!["row".into(), row_number.into(), "name".into()],
                    "name is required and must be at least 1 character",
                    "value_error",
                ));
                row_valid = false;
            }
            if address.is_empty() {
                errors.push(ValidationErrorDetail::new(
                    vec!["row".into(), row_number.into(), "address".into()],
                    "address is required and must be at least 1 character",
                    "value_error",
                ));
                row_valid = false;
            }

            if row_valid {
                rows.push(ParsedRow {
                    name,
                    address,
                    phone: phone.map(str::to_string),
                });
            }
        }

        if rows.is_empty() && errors.is_empty() {
            errors.push(ValidationErrorDetail::new(
                vec!["file".into(), "content".into()],
                "CSV file contains no data rows",
                "empty_file",
            ));
        }

        if !errors.is_empty() {
            return Err(ServiceError::CsvValidation(errors));
        }

        Ok(rows)
    }
}
