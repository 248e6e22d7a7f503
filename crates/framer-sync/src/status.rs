//! Shared loading/error state
//!
//! One process-wide `is_loading` flag and one latest-error slot for the whole
//! store. A second failure overwrites the first. The flag is backed by an
//! in-flight counter so overlapping calls keep it set until the last one ends.

use crate::error::SyncError;
use parking_lot::Mutex;
use tokio::sync::watch;

/// Observable store status
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStatus {
    /// A remote call is in flight
    pub is_loading: bool,
    /// Latest reported error message
    pub error: Option<String>,
}

#[derive(Debug)]
pub(crate) struct StatusSlot {
    tx: watch::Sender<SyncStatus>,
    in_flight: Mutex<usize>,
}

impl StatusSlot {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(SyncStatus::default());
        Self {
            tx,
            in_flight: Mutex::new(0),
        }
    }

    pub(crate) fn current(&self) -> SyncStatus {
        self.tx.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.tx.subscribe()
    }

    /// Mark a call in flight until the guard drops
    pub(crate) fn begin(&self) -> LoadingGuard<'_> {
        let mut count = self.in_flight.lock();
        *count += 1;
        if *count == 1 {
            self.tx.send_if_modified(|s| !std::mem::replace(&mut s.is_loading, true));
        }
        LoadingGuard { slot: self }
    }

    fn end(&self) {
        let mut count = self.in_flight.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.tx.send_if_modified(|s| std::mem::replace(&mut s.is_loading, false));
        }
    }

    /// Store the error message unless it is a best-effort failure
    pub(crate) fn record(&self, err: &SyncError) {
        if !err.is_reportable() {
            return;
        }
        tracing::error!(error = %err, "Operation failed");
        let message = err.to_string();
        self.tx.send_modify(|s| s.error = Some(message));
    }

    pub(crate) fn clear_error(&self) {
        self.tx.send_if_modified(|s| s.error.take().is_some());
    }

    pub(crate) fn reset(&self) {
        *self.in_flight.lock() = 0;
        self.tx.send_replace(SyncStatus::default());
    }
}

/// Keeps `is_loading` set while alive
#[derive(Debug)]
pub(crate) struct LoadingGuard<'a> {
    slot: &'a StatusSlot,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.slot.end();
    }
}
