use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::entities::Outcome;

/// Point-in-time copy of a client's ingestion counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub applied_updates: u64,
    /// Stale or regressing updates.
    pub dropped_updates: u64,
    pub duplicate_updates: u64,
    pub malformed_updates: u64,
    /// Updates for journeys without a live subscription.
    pub orphaned_updates: u64,
    pub route_changes: u64,
    pub reconnects: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    applied: AtomicU64,
    dropped: AtomicU64,
    duplicates: AtomicU64,
    malformed: AtomicU64,
    orphaned: AtomicU64,
    route_changes: AtomicU64,
    reconnects: AtomicU64,
}

impl Counters {
    pub fn record(&self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Applied => &self.applied,
            Outcome::RouteChanged => {
                self.route_changes.fetch_add(1, Ordering::Relaxed);
                &self.applied
            }
            Outcome::Duplicate => &self.duplicates,
            Outcome::Stale | Outcome::Regressed => &self.dropped,
        };

        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_orphaned(&self) {
        self.orphaned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Diagnostics {
        Diagnostics {
            applied_updates: self.applied.load(Ordering::Relaxed),
            dropped_updates: self.dropped.load(Ordering::Relaxed),
            duplicate_updates: self.duplicates.load(Ordering::Relaxed),
            malformed_updates: self.malformed.load(Ordering::Relaxed),
            orphaned_updates: self.orphaned.load(Ordering::Relaxed),
            route_changes: self.route_changes.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }
}
