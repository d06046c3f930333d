//! `SQLite`-backed durable store.
//!
//! One row per identity in a single `dossiers` table, WAL mode for
//! durability across crashes. `save_all` replaces the whole table inside
//! one transaction, so a failed save leaves the previous snapshot intact.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, params};

use super::{PersistError, RawRecord, StorageBackend};

const SCHEMA_SQL: &str = "\
CREATE TABLE IF NOT EXISTS dossiers (
    player_id TEXT PRIMARY KEY,
    record    TEXT NOT NULL
);
";

/// Durable dossier storage in a `SQLite` database file.
#[derive(Debug)]
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Opens (creating if needed) the database at `path` and applies the
    /// schema.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Database`] when the file cannot be opened
    /// or the schema cannot be applied.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a private in-memory database. Test use.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Database`] when the database cannot be
    /// created.
    pub fn in_memory() -> Result<Self, PersistError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl StorageBackend for SqliteBackend {
    fn load_all(&self) -> Result<Vec<RawRecord>, PersistError> {
        let conn = self.conn.lock().expect("lock poisoned");
        let mut stmt = conn.prepare("SELECT player_id, record FROM dossiers")?;
        let rows = stmt.query_map([], |row| {
            Ok(RawRecord {
                key: row.get(0)?,
                value: row.get(1)?,
            })
        })?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    fn save_all(&self, records: &[RawRecord]) -> Result<(), PersistError> {
        let mut conn = self.conn.lock().expect("lock poisoned");
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM dossiers", [])?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO dossiers (player_id, record) VALUES (?1, ?2)")?;
            for record in records {
                stmt.execute(params![record.key, record.value])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn clear(&self) -> Result<(), PersistError> {
        let conn = self.conn.lock().expect("lock poisoned");
        conn.execute("DELETE FROM dossiers", [])?;
        Ok(())
    }
}
