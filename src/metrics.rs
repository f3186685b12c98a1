use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time view of the throttling counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub tracked_clients: u64,
    pub clients_created: u64,
    pub clients_evicted: u64,
    pub allowed_requests: u64,
    pub throttled_requests: u64,
    pub rejected_requests: u64,
}

/// Lock-free counters updated on the request path and by the sweeper
#[derive(Debug, Default)]
pub struct RegistryMetrics {
    clients_created: AtomicU64,
    clients_evicted: AtomicU64,
    allowed_requests: AtomicU64,
    throttled_requests: AtomicU64,
    rejected_requests: AtomicU64,
}

impl RegistryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_created(&self) {
        self.clients_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_evicted(&self, count: usize) {
        self.clients_evicted.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record the outcome of an admission check
    pub fn record_request(&self, allowed: bool) {
        if allowed {
            self.allowed_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.throttled_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a request turned away before any limiter lookup
    pub fn record_rejected(&self) {
        self.rejected_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, tracked_clients: usize) -> MetricsSnapshot {
        MetricsSnapshot {
            tracked_clients: tracked_clients as u64,
            clients_created: self.clients_created.load(Ordering::Relaxed),
            clients_evicted: self.clients_evicted.load(Ordering::Relaxed),
            allowed_requests: self.allowed_requests.load(Ordering::Relaxed),
            throttled_requests: self.throttled_requests.load(Ordering::Relaxed),
            rejected_requests: self.rejected_requests.load(Ordering::Relaxed),
        }
    }
}
