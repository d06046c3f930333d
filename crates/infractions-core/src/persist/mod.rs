//! Load-at-startup / save-at-shutdown bridge between the in-memory store
//! and a durable backend.
//!
//! The backend is an abstract key-value file store: one raw record per
//! identity, opaque to the backend. [`SqliteBackend`] is the production
//! implementation ([`MemoryBackend`] backs tests), and the
//! [`PersistenceGateway`] owns the encode/decode boundary:
//!
//! - **Load** decodes record by record; a record that fails to parse is
//!   skipped with a warning so one corrupt row cannot lose every other
//!   player's history.
//! - **Save** snapshots dossier references under the store lock and
//!   serializes outside it, so a large save never blocks per-identity
//!   reads and writes for the serialization duration. Save failures
//!   surface as [`PersistError`]; they are never silently dropped.

mod memory;
mod records;
mod sqlite;
#[cfg(test)]
mod tests;

pub use memory::MemoryBackend;
pub use records::{DossierRecord, InfractionRecord};
pub use sqlite::SqliteBackend;

use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::store::InfractionStore;

/// Errors from the durable layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PersistError {
    /// `SQLite` error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A dossier could not be serialized for saving.
    #[error("record encode failed for {key}: {source}")]
    Encode {
        /// The identity key whose record failed to encode.
        key: String,
        /// The underlying serialization error.
        source: serde_json::Error,
    },
}

/// One serialized dossier, keyed by its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// The identity, in canonical UUID form.
    pub key: String,
    /// The serialized dossier record.
    pub value: String,
}

/// Abstract durable key-value store, one record per identity.
///
/// Backends move raw records only; parsing and its partial-failure policy
/// live in the [`PersistenceGateway`].
pub trait StorageBackend: Send + Sync {
    /// Loads every stored record.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when the backing store cannot be read at
    /// all. Individually unreadable records are the gateway's concern, not
    /// the backend's.
    fn load_all(&self) -> Result<Vec<RawRecord>, PersistError>;

    /// Replaces the durable contents with the given snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when the write does not fully succeed; a
    /// partial write must not be reported as success.
    fn save_all(&self, records: &[RawRecord]) -> Result<(), PersistError>;

    /// Erases all durable state. Used by a full data reset.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when the erase fails.
    fn clear(&self) -> Result<(), PersistError>;
}

/// Owns the file lifecycle between an [`InfractionStore`] and a backend.
pub struct PersistenceGateway {
    backend: Arc<dyn StorageBackend>,
}

impl PersistenceGateway {
    /// Creates a gateway over a backend.
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Loads every decodable record into the store, returning how many
    /// dossiers were registered. Undecodable records are skipped with a
    /// warning; the load continues.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] only when the backend itself cannot be
    /// read.
    pub fn load_into(&self, store: &InfractionStore) -> Result<usize, PersistError> {
        let rows = self.backend.load_all()?;
        let mut loaded = 0usize;
        for row in rows {
            match serde_json::from_str::<DossierRecord>(&row.value) {
                Ok(record) => {
                    store.add_dossier(record.into_dossier());
                    loaded += 1;
                }
                Err(err) => {
                    warn!(key = %row.key, error = %err, "skipping undecodable dossier record");
                }
            }
        }
        Ok(loaded)
    }

    /// Serializes a snapshot of the store and replaces the durable
    /// contents with it, returning how many records were written.
    ///
    /// Safe to call while other threads mutate dossiers: the store lock is
    /// held only long enough to copy references.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when a record fails to encode or the
    /// backend write fails.
    pub fn save_from(&self, store: &InfractionStore) -> Result<usize, PersistError> {
        let snapshot = store.all_dossiers();
        let mut records = Vec::with_capacity(snapshot.len());
        for dossier in snapshot {
            let record = DossierRecord::from_dossier(&dossier);
            let value =
                serde_json::to_string(&record).map_err(|source| PersistError::Encode {
                    key: dossier.id().to_string(),
                    source,
                })?;
            records.push(RawRecord {
                key: dossier.id().to_string(),
                value,
            });
        }
        self.backend.save_all(&records)?;
        Ok(records.len())
    }

    /// Erases all durable state.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when the erase fails.
    pub fn clear(&self) -> Result<(), PersistError> {
        self.backend.clear()
    }
}
