use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Snapshot of dispatcher counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatcherStats {
    /// Jobs accepted onto the queue
    pub dispatched: u64,
    /// Jobs whose handler returned `Ok`
    pub succeeded: u64,
    /// Jobs whose handler returned `Err`
    pub failed: u64,
    /// Jobs lost to a panicking handler or a shutdown
    pub lost: u64,
    /// Dispatches refused because the queue was full
    pub rejected: u64,
}

/// Failure journal shared by all workers of a dispatcher
///
/// Individual failures are logged where they happen; the journal keeps the totals.
#[derive(Debug, Default)]
pub(crate) struct Journal {
    dispatched: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    lost: AtomicU64,
    rejected: AtomicU64,
}

impl Journal {
    pub(crate) fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_lost(&self) {
        self.lost.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> DispatcherStats {
        DispatcherStats {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            lost: self.lost.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}
