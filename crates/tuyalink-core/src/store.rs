// ── Snapshot store ──
//
// Holds the last published device snapshot and the availability flag.
// Readers get a cheap `watch` view of the latest value; every publish is
// also broadcast so adapters can react to each update.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};

use crate::model::Snapshot;

const UPDATE_CHANNEL_SIZE: usize = 16;

pub struct SnapshotStore {
    latest: watch::Sender<Option<Arc<Snapshot>>>,
    updates: broadcast::Sender<Arc<Snapshot>>,
    available: watch::Sender<bool>,
    last_update: watch::Sender<Option<DateTime<Utc>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (latest, _) = watch::channel(None);
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_SIZE);
        let (available, _) = watch::channel(false);
        let (last_update, _) = watch::channel(None);

        Self {
            latest,
            updates,
            available,
            last_update,
        }
    }

    /// Replace the latest snapshot and notify subscribers.
    pub(crate) fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        self.latest.send_replace(Some(Arc::clone(&snapshot)));
        self.last_update.send_replace(Some(Utc::now()));
        // No receivers is fine.
        let _ = self.updates.send(Arc::clone(&snapshot));
        snapshot
    }

    pub(crate) fn set_available(&self, available: bool) {
        self.available.send_if_modified(|current| {
            let changed = *current != available;
            *current = available;
            changed
        });
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// The last published snapshot, or `None` before the first publish.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.latest.borrow().clone()
    }

    /// `true` iff the last scheduled refresh succeeded.
    pub fn is_available(&self) -> bool {
        *self.available.borrow()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        *self.last_update.borrow()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    /// Watch the latest snapshot. Intermediate values may be skipped.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.latest.subscribe()
    }

    /// Receive every published snapshot in order.
    pub fn updates(&self) -> broadcast::Receiver<Arc<Snapshot>> {
        self.updates.subscribe()
    }

    pub fn availability(&self) -> watch::Receiver<bool> {
        self.available.subscribe()
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
