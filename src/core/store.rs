//! In-memory batch registry
//!
//! Keyed storage for [`BatchRecord`]s, shared between the HTTP handlers and
//! the background creation tasks. Records live for the process lifetime; no
//! TTL or eviction.

use crate::core::models::BatchRecord;
use dashmap::DashMap;

/// Single-process registry from batch identity to its record.
///
/// Mutations go through [`BatchStore::with_mut`], which holds the map's
/// per-shard lock for the duration of the closure. Callers must not await
/// inside the closure; remote calls happen before or after, never under the
/// lock.
#[derive(Debug, Default)]
pub struct BatchStore {
    batches: DashMap<String, BatchRecord>,
}

impl BatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a record under its batch identity
    pub fn save(&self, record: BatchRecord) {
        self.batches.insert(record.batch_id.clone(), record);
    }

    /// Cloned snapshot of a record, if the identity is known
    pub fn get(&self, batch_id: &str) -> Option<BatchRecord> {
        self.batches.get(batch_id).map(|entry| entry.clone())
    }

    pub fn exists(&self, batch_id: &str) -> bool {
        self.batches.contains_key(batch_id)
    }

    /// Read-modify-write a record as one indivisible step.
    ///
    /// Returns `None` if the identity is unknown, otherwise the closure's
    /// result.
    pub fn with_mut<R>(
        &self,
        batch_id: &str,
        f: impl FnOnce(&mut BatchRecord) -> R,
    ) -> Option<R> {
        self.batches.get_mut(batch_id).map(|mut entry| f(&mut entry))
    }
}
