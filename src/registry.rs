//! Per-client limiter registry with idle eviction.
//!
//! Every distinct client key owns exactly one limiter for as long as it keeps
//! sending requests. A background sweeper forgets clients that have been quiet
//! for longer than the idle timeout, which bounds memory under high-cardinality
//! traffic. A forgotten client that comes back starts over with a full burst.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::algorithms::Limiter;
use crate::config::ThrottleConfig;
use crate::metrics::{MetricsSnapshot, RegistryMetrics};
use crate::token_bucket::TokenBucket;

/// Throttling state of one client
#[derive(Debug)]
struct ClientState<L> {
    limiter: Arc<L>,
    /// Last request attributed to the client, admitted or not
    last_seen: Instant,
}

struct Inner<L> {
    config: ThrottleConfig,
    entries: Mutex<HashMap<String, ClientState<L>>>,
    metrics: RegistryMetrics,
}

/// Shared handle to the client map. Clones refer to the same registry.
pub struct ClientRegistry<L = TokenBucket> {
    inner: Arc<Inner<L>>,
}

impl<L> Clone for ClientRegistry<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: Limiter> Default for ClientRegistry<L> {
    fn default() -> Self {
        Self::new(ThrottleConfig::default())
    }
}

impl<L: Limiter> ClientRegistry<L> {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                entries: Mutex::new(HashMap::new()),
                metrics: RegistryMetrics::new(),
            }),
        }
    }

    /// Limiter for `key`, created on first sight.
    ///
    /// Refreshes the client's last-seen time whether or not the request ends
    /// up admitted, so a client hammering while throttled is never idle.
    pub fn get_or_create(&self, key: &str) -> Arc<L> {
        let now = Instant::now();
        let mut entries = self.inner.entries.lock();

        if let Some(state) = entries.get_mut(key) {
            state.last_seen = now;
            return Arc::clone(&state.limiter);
        }

        let limiter = Arc::new(L::with_quota(self.inner.config.quota));
        entries.insert(
            key.to_string(),
            ClientState {
                limiter: Arc::clone(&limiter),
                last_seen: now,
            },
        );
        self.inner.metrics.record_created();
        debug!(target: "ipthrottle::registry", client = %key, "Tracking new client");

        limiter
    }

    /// Evict every client idle for longer than the idle timeout.
    ///
    /// Returns the number of evicted clients.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let idle_timeout = self.inner.config.idle_timeout;

        let (evicted, remaining) = {
            let mut entries = self.inner.entries.lock();
            let before = entries.len();
            entries.retain(|_, state| now.duration_since(state.last_seen) <= idle_timeout);
            (before - entries.len(), entries.len())
        };

        if evicted > 0 {
            self.inner.metrics.record_evicted(evicted);
            debug!(
                target: "ipthrottle::registry",
                evicted,
                remaining,
                "Evicted idle clients"
            );
        }

        evicted
    }

    /// Run `sweep` every sweep interval on the tokio runtime.
    ///
    /// The task only holds a weak reference and stops once every handle to
    /// the registry has been dropped.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let weak: Weak<Inner<L>> = Arc::downgrade(&self.inner);
        let interval = self.inner.config.sweep_interval;

        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;

                let Some(inner) = weak.upgrade() else {
                    debug!(target: "ipthrottle::registry", "Registry dropped, sweeper exiting");
                    break;
                };
                ClientRegistry { inner }.sweep();
            }
        })
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.inner.config
    }

    pub fn metrics(&self) -> &RegistryMetrics {
        &self.inner.metrics
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot(self.len())
    }

    /// Number of tracked clients
    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.entries.lock().contains_key(key)
    }
}
