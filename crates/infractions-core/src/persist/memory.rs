//! In-memory storage backend for tests and ephemeral servers.

use std::collections::BTreeMap;
use std::sync::RwLock;

use super::{PersistError, RawRecord, StorageBackend};

/// Keeps records in a map; never fails. Supports seeding arbitrary raw
/// rows so tests can exercise the gateway's corrupt-record tolerance.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    rows: RwLock<BTreeMap<String, String>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a raw row, bypassing the gateway's encoder.
    pub fn insert_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        self.rows
            .write()
            .expect("lock poisoned")
            .insert(key.into(), value.into());
    }

    /// Number of stored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().expect("lock poisoned").len()
    }

    /// Whether no rows are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().expect("lock poisoned").is_empty()
    }

    /// Snapshot of the raw rows, ordered by key.
    #[must_use]
    pub fn dump(&self) -> Vec<RawRecord> {
        self.rows
            .read()
            .expect("lock poisoned")
            .iter()
            .map(|(key, value)| RawRecord {
                key: key.clone(),
                value: value.clone(),
            })
            .collect()
    }
}

impl StorageBackend for MemoryBackend {
    fn load_all(&self) -> Result<Vec<RawRecord>, PersistError> {
        Ok(self.dump())
    }

    fn save_all(&self, records: &[RawRecord]) -> Result<(), PersistError> {
        let mut rows = self.rows.write().expect("lock poisoned");
        rows.clear();
        for record in records {
            rows.insert(record.key.clone(), record.value.clone());
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), PersistError> {
        self.rows.write().expect("lock poisoned").clear();
        Ok(())
    }
}
