//! Originator store: pings we sent and whether their pong came back.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  PingStore                                                      │
//! │  ├── writer: Mutex<Vec<Sender>>                                 │
//! │  │   └── held for every mutation; owns the subscriber registry │
//! │  ├── snapshot: RwLock<Vec<PingRecord>>                          │
//! │  │   └── replaced wholesale after a successful backend write   │
//! │  └── backend: RecordBackend (get-all / set-all)                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Mutations (`originate`, `correlate`, `clear`) run one at a time. Each one
//! builds the next record list, persists it, publishes it, then pushes it to
//! every subscriber before releasing the writer lock, so subscribers see
//! snapshots in mutation order. Readers only ever see complete snapshots.

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::{PingError, PingResult};
use crate::types::PingRecord;

mod backend;
mod subscription;

pub use backend::{MemoryBackend, RecordBackend, RedbBackend};
pub use subscription::Subscription;

type Subscriber = mpsc::UnboundedSender<Vec<PingRecord>>;

/// Durable, observable set of originated pings.
pub struct PingStore<B> {
    backend: B,
    writer: Mutex<Vec<Subscriber>>,
    snapshot: RwLock<Vec<PingRecord>>,
}

impl PingStore<MemoryBackend> {
    /// A store that forgets everything when dropped.
    pub fn in_memory() -> Self {
        Self {
            backend: MemoryBackend::default(),
            writer: Mutex::new(Vec::new()),
            snapshot: RwLock::new(Vec::new()),
        }
    }
}

impl<B: RecordBackend> PingStore<B> {
    /// Open a store over `backend`, loading whatever it already holds.
    pub fn open(backend: B) -> PingResult<Self> {
        let records = backend.load_all()?;
        debug!(count = records.len(), "Loaded ping records");
        Ok(Self {
            backend,
            writer: Mutex::new(Vec::new()),
            snapshot: RwLock::new(records),
        })
    }

    /// Record a freshly sent ping as pending.
    ///
    /// # Errors
    ///
    /// Returns `PingError::DuplicateId` if `id` is already tracked.
    pub fn originate(&self, id: &str) -> PingResult<PingRecord> {
        let mut subscribers = self.writer.lock();

        let mut records = self.snapshot.read().clone();
        if records.iter().any(|record| record.id == id) {
            return Err(PingError::DuplicateId(id.to_string()));
        }
        let record = PingRecord::new(id);
        records.push(record.clone());

        self.publish(&mut subscribers, records)?;
        debug!(ping_id = id, "Originated ping");
        Ok(record)
    }

    /// Mark the ping `id` as answered.
    ///
    /// Unknown ids and pings already answered are left alone. Returns whether
    /// a record changed.
    pub fn correlate(&self, id: &str) -> PingResult<bool> {
        let mut subscribers = self.writer.lock();

        let mut records = self.snapshot.read().clone();
        let Some(record) = records
            .iter_mut()
            .find(|record| record.id == id && record.received_at.is_none())
        else {
            debug!(ping_id = id, "Pong does not match a pending ping");
            return Ok(false);
        };
        record.received_at = Some(chrono::Utc::now().timestamp_millis());

        self.publish(&mut subscribers, records)?;
        debug!(ping_id = id, "Correlated pong");
        Ok(true)
    }

    /// All records, in origination order.
    pub fn list(&self) -> Vec<PingRecord> {
        self.snapshot.read().clone()
    }

    /// A single record by id.
    pub fn get(&self, id: &str) -> Option<PingRecord> {
        self.snapshot
            .read()
            .iter()
            .find(|record| record.id == id)
            .cloned()
    }

    /// Remove every record. Irrecoverable.
    pub fn clear(&self) -> PingResult<()> {
        let mut subscribers = self.writer.lock();
        let removed = self.snapshot.read().len();
        self.publish(&mut subscribers, Vec::new())?;
        info!(removed, "Cleared ping records");
        Ok(())
    }

    /// Subscribe to snapshots of the record set.
    ///
    /// The subscription starts with the current snapshot, then receives a new
    /// one after every mutation.
    ///
    /// Snapshots queue without bound until read, each one a full copy of the
    /// record set. Keep draining the subscription, or drop it once it is no
    /// longer needed.
    pub fn observe(&self) -> Subscription {
        let mut subscribers = self.writer.lock();
        let (tx, rx) = mpsc::unbounded_channel();
        // Cannot fail: we still hold the receiver.
        let _ = tx.send(self.snapshot.read().clone());
        subscribers.push(tx);
        Subscription::new(rx)
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.writer.lock();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }

    /// Persist `records`, make them the visible snapshot and notify.
    ///
    /// Must be called with the writer lock held. Nothing is published if the
    /// backend write fails.
    fn publish(&self, subscribers: &mut Vec<Subscriber>, records: Vec<PingRecord>) -> PingResult<()> {
        self.backend.save_all(&records)?;
        *self.snapshot.write() = records.clone();
        subscribers.retain(|tx| tx.send(records.clone()).is_ok());
        Ok(())
    }
}
