//! Live view of the ping store.

use tokio::sync::mpsc;

use crate::types::PingRecord;

/// A stream of store snapshots, oldest first.
///
/// The queue is unbounded: a subscription that is never read holds every
/// snapshot published since it was created. Dropping the subscription
/// unregisters it on the next mutation.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Vec<PingRecord>>,
}

impl Subscription {
    pub(super) fn new(rx: mpsc::UnboundedReceiver<Vec<PingRecord>>) -> Self {
        Self { rx }
    }

    /// Wait for the next snapshot.
    ///
    /// Returns `None` once the store has been dropped and every queued
    /// snapshot was consumed.
    pub async fn next(&mut self) -> Option<Vec<PingRecord>> {
        self.rx.recv().await
    }

    /// The next queued snapshot, if one is already waiting.
    pub fn try_next(&mut self) -> Option<Vec<PingRecord>> {
        self.rx.try_recv().ok()
    }
}
