//! Rate limiting algorithms module
//!
//! The registry and middleware only depend on the [`Limiter`] capability,
//! so the refill arithmetic can be swapped without touching them.

use serde::{Deserialize, Serialize};

// Re-export the token bucket from the crate root
pub use crate::token_bucket::TokenBucket;

/// Construction parameters shared by every limiter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quota {
    /// Tokens added per second
    pub refill_rate: f64,
    /// Maximum number of tokens the bucket can hold
    pub burst: u32,
}

impl Quota {
    pub fn new(refill_rate: f64, burst: u32) -> Self {
        Self { refill_rate, burst }
    }
}

impl Default for Quota {
    fn default() -> Self {
        Self {
            refill_rate: 1.0,
            burst: 3,
        }
    }
}

/// A per-client admission decision maker.
///
/// `allow` must never block: it either consumes capacity and returns `true`,
/// or returns `false` straight away.
pub trait Limiter: Send + Sync + 'static {
    /// Build a fresh limiter with full burst capacity
    fn with_quota(quota: Quota) -> Self
    where
        Self: Sized;

    /// Consume one unit of capacity if available
    fn allow(&self) -> bool;
}
