//! Service counters
//!
//! Plain atomic counters updated by the engine loop and readable from any
//! thread. `export` gives a sorted name → value map for logging or scraping.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Core counters for the market view engine.
#[derive(Debug, Default)]
pub struct ServiceMetrics {
    // Ingestion
    pub events_accepted: AtomicU64,
    pub events_ignored: AtomicU64,
    pub events_rejected: AtomicU64,

    // Derivation and publication
    pub recomputations: AtomicU64,
    pub publications: AtomicU64,
    pub publish_failures: AtomicU64,

    // Control
    pub selection_changes: AtomicU64,
    pub config_changes: AtomicU64,
    pub config_rejections: AtomicU64,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_accepted(&self) {
        self.events_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ignored(&self) {
        self.events_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.events_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a derived view built for publication.
    pub fn record_recomputation(&self) {
        self.recomputations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a view handed to the sink.
    pub fn record_publication(&self, delivered: bool) {
        if delivered {
            self.publications.fetch_add(1, Ordering::Relaxed);
        } else {
            self.publish_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_selection_change(&self) {
        self.selection_changes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a parameter update, accepted or not.
    pub fn record_config_change(&self, accepted: bool) {
        if accepted {
            self.config_changes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.config_rejections.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Export counters as a BTreeMap for sorted exposition.
    pub fn export(&self) -> BTreeMap<String, u64> {
        let mut m = BTreeMap::new();
        m.insert("events_accepted".to_string(), self.events_accepted.load(Ordering::Relaxed));
        m.insert("events_ignored".to_string(), self.events_ignored.load(Ordering::Relaxed));
        m.insert("events_rejected".to_string(), self.events_rejected.load(Ordering::Relaxed));
        m.insert("recomputations".to_string(), self.recomputations.load(Ordering::Relaxed));
        m.insert("publications".to_string(), self.publications.load(Ordering::Relaxed));
        m.insert("publish_failures".to_string(), self.publish_failures.load(Ordering::Relaxed));
        m.insert("selection_changes".to_string(), self.selection_changes.load(Ordering::Relaxed));
        m.insert("config_changes".to_string(), self.config_changes.load(Ordering::Relaxed));
        m.insert("config_rejections".to_string(), self.config_rejections.load(Ordering::Relaxed));
        m
    }
}
