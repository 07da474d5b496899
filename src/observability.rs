//! In-process counters mirrored into `tracing` and reported from `/health`

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics handle for recording counters
#[derive(Debug, Default)]
pub struct Metrics {
    captures_accepted: AtomicU64,
    captures_unknown: AtomicU64,
    store_failures: AtomicU64,
    alerts_raised: AtomicU64,
    alerts_relayed: AtomicU64,
    relay_failures: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture_accepted(&self) {
        self.captures_accepted.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "captures_accepted", "Metric incremented");
    }

    pub fn capture_unknown(&self) {
        self.captures_unknown.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "captures_unknown", "Metric incremented");
    }

    pub fn store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "store_failures", "Metric incremented");
    }

    pub fn alert_raised(&self) {
        self.alerts_raised.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "alerts_raised", "Metric incremented");
    }

    pub fn alert_relayed(&self) {
        self.alerts_relayed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "alerts_relayed", "Metric incremented");
    }

    pub fn relay_failed(&self) {
        self.relay_failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "relay_failures", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            captures_accepted: self.captures_accepted.load(Ordering::Relaxed),
            captures_unknown: self.captures_unknown.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
            alerts_raised: self.alerts_raised.load(Ordering::Relaxed),
            alerts_relayed: self.alerts_relayed.load(Ordering::Relaxed),
            relay_failures: self.relay_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub captures_accepted: u64,
    pub captures_unknown: u64,
    pub store_failures: u64,
    pub alerts_raised: u64,
    pub alerts_relayed: u64,
    pub relay_failures: u64,
}
