//! Persistence behind the ping store.
//!
//! The store only needs get-all / set-all, so any key-value engine can sit
//! underneath. Records are kept as one JSON list under a single key.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use redb::{Database, ReadableTable, TableDefinition};

use crate::error::{PingError, PingResult};
use crate::types::PingRecord;

/// Table holding the record list (key: [`RECORDS_KEY`], value: JSON array)
const PINGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("pings");

const RECORDS_KEY: &str = "pings";

/// Durable home of the ping record list.
pub trait RecordBackend: Send + Sync {
    /// Every stored record, in the order they were saved.
    fn load_all(&self) -> PingResult<Vec<PingRecord>>;

    /// Replace the stored records with `records`.
    fn save_all(&self, records: &[PingRecord]) -> PingResult<()>;
}

/// Volatile backend, for tests and throwaway stores.
#[derive(Default)]
pub struct MemoryBackend {
    records: Mutex<Vec<PingRecord>>,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    /// Make subsequent writes fail, to exercise error paths.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl RecordBackend for MemoryBackend {
    fn load_all(&self) -> PingResult<Vec<PingRecord>> {
        Ok(self.records.lock().clone())
    }

    fn save_all(&self, records: &[PingRecord]) -> PingResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PingError::Storage("writes are disabled".to_string()));
        }
        *self.records.lock() = records.to_vec();
        Ok(())
    }
}

/// redb-backed storage for ping records.
#[derive(Clone)]
pub struct RedbBackend {
    db: Arc<RwLock<Database>>,
}

impl RedbBackend {
    /// Open (or create) the database at `path`.
    ///
    /// Creates the parent directory and the records table if needed.
    pub fn open(path: impl AsRef<Path>) -> PingResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PINGS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(RwLock::new(db)),
        })
    }
}

impl RecordBackend for RedbBackend {
    fn load_all(&self) -> PingResult<Vec<PingRecord>> {
        let db = self.db.read();
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(PINGS_TABLE)?;

        match table.get(RECORDS_KEY)? {
            Some(v) => serde_json::from_slice(v.value())
                .map_err(|e| PingError::Serialization(e.to_string())),
            None => Ok(Vec::new()),
        }
    }

    fn save_all(&self, records: &[PingRecord]) -> PingResult<()> {
        let data =
            serde_json::to_vec(records).map_err(|e| PingError::Serialization(e.to_string()))?;

        let db = self.db.read();
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(PINGS_TABLE)?;
            table.insert(RECORDS_KEY, data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}
