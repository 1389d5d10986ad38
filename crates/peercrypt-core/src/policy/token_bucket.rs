//! Token bucket policy: leaky-bucket rate limiting independent of ACK
//! feedback (spec §4.5.2).

use super::{PacingGate, SendDecision};
use crate::error::PolicyError;
use std::time::{Duration, Instant};

/// Refills at a fixed byte rate up to `capacity`, admitting a send only
/// when enough tokens have accumulated to cover the chunk.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: f64,
    rate_per_sec: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// A bucket holding at most `capacity` bytes, refilling at
    /// `rate_per_sec` bytes/second, starting full.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidTokenBucketParams`] if either
    /// `capacity` or `rate_per_sec` is zero.
    pub fn new(capacity: u64, rate_per_sec: u64) -> Result<Self, PolicyError> {
        if capacity == 0 || rate_per_sec == 0 {
            return Err(PolicyError::InvalidTokenBucketParams);
        }
        Ok(Self {
            capacity: capacity as f64,
            rate_per_sec: rate_per_sec as f64,
            tokens: capacity as f64,
            last_refill: Instant::now(),
        })
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    /// Current token balance, in bytes.
    #[must_use]
    pub fn tokens(&self) -> f64 {
        self.tokens
    }
}

impl PacingGate for TokenBucket {
    fn poll(&mut self, chunk_len: u32, _outstanding: usize, now: Instant) -> SendDecision {
        self.refill(now);
        if self.tokens >= f64::from(chunk_len) {
            SendDecision::SendNow
        } else {
            let deficit = f64::from(chunk_len) - self.tokens;
            let wait_secs = deficit / self.rate_per_sec;
            SendDecision::WaitUntil(now + Duration::from_secs_f64(wait_secs))
        }
    }

    fn on_send(&mut self, chunk_len: u32, now: Instant) {
        self.refill(now);
        self.tokens -= f64::from(chunk_len);
    }
}
