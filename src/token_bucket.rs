use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::algorithms::{Limiter, Quota};

/// Continuously refilling token bucket.
///
/// Interior mutability lets a single bucket be shared behind an `Arc` by
/// every in-flight request of the same client.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: u32,
    refill_rate: f64, // tokens per second
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(capacity: u32, refill_rate: f64) -> Self {
        Self {
            capacity,
            refill_rate,
            state: Mutex::new(BucketState {
                tokens: capacity as f64,
                last_refill: Instant::now(),
            }),
        }
    }

    pub fn consume(&self, tokens: u32) -> bool {
        let mut state = self.state.lock();
        self.refill(&mut state);

        if state.tokens >= tokens as f64 {
            state.tokens -= tokens as f64;
            true
        } else {
            false
        }
    }

    pub fn available_tokens(&self) -> u32 {
        let mut state = self.state.lock();
        self.refill(&mut state);
        state.tokens.floor() as u32
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    /// How long until `required_tokens` are available, `None` if they already are
    pub fn time_until_available(&self, required_tokens: u32) -> Option<Duration> {
        let mut state = self.state.lock();
        self.refill(&mut state);

        if state.tokens >= required_tokens as f64 {
            return None;
        }
        if self.refill_rate <= 0.0 {
            return Some(Duration::MAX);
        }

        let tokens_needed = required_tokens as f64 - state.tokens;
        // Tiny rates overflow Duration
        let secs = tokens_needed / self.refill_rate;
        Some(Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX))
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill);

        if elapsed > Duration::from_millis(1) {
            let tokens_to_add = self.refill_rate * elapsed.as_secs_f64();

            // Never bank more than the burst capacity
            state.tokens = (state.tokens + tokens_to_add).min(self.capacity as f64);
            state.last_refill = now;
        }
    }
}

impl Limiter for TokenBucket {
    fn with_quota(quota: Quota) -> Self {
        Self::new(quota.burst, quota.refill_rate)
    }

    fn allow(&self) -> bool {
        self.consume(1)
    }
}
