//! Per-client token bucket rate limiting.
//!
//! Every client identifier gets its own bucket holding up to `capacity` tokens,
//! refilled continuously at `refill_per_sec`. Buckets start full and live for the
//! lifetime of the process.

use std::{collections::HashMap, time::Instant};

use parking_lot::Mutex;

/// Admit/deny decision per client.
#[cfg_attr(test, mockall::automock)]
pub trait RateLimiter: Send + Sync {
    /// Take one token from the client's bucket. Returns false when the bucket is
    /// empty; a denied request takes nothing.
    fn admit(&self, client: &str) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// In-memory token bucket limiter guarded by a single lock.
pub struct TokenBucketLimiter {
    capacity: f64,
    refill_per_sec: f64,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl TokenBucketLimiter {
    pub fn new(capacity: u32, refill_per_sec: f64) -> Self {
        let refill_per_sec = if refill_per_sec.is_finite() {
            refill_per_sec.max(0.0)
        } else {
            0.0
        };

        Self {
            capacity: f64::from(capacity),
            refill_per_sec,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.buckets.lock().len()
    }

    fn admit_at(&self, client: &str, now: Instant) -> bool {
        let mut buckets = self.buckets.lock();

        let bucket = buckets.entry(client.to_owned()).or_insert(Bucket {
            tokens: self.capacity,
            last_refill: now,
        });

        if now > bucket.last_refill {
            let elapsed = (now - bucket.last_refill).as_secs_f64();
            bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
            bucket.last_refill = now;
        }

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

impl RateLimiter for TokenBucketLimiter {
    fn admit(&self, client: &str) -> bool {
        self.admit_at(client, Instant::now())
    }
}
