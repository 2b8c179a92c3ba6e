//! Ephemeral in-process stores.
//!
//! Both stores are shared by every request and live for the lifetime of the
//! process; nothing here survives a restart.
//!
//! ## Stores
//!
//! - **rate_limit** - Per-client token buckets (keyed by client IP)
//! - **otp** - Pending one-time passcodes (keyed by username, 5 min expiry)
//!
//! ## Usage in Handlers
//!
//! Stores are accessed via `state.stores`:
//!
//! ```ignore
//! if !state.stores.rate_limiter.admit(&client_ip) {
//!     return Err(AppError::External(StatusCode::TOO_MANY_REQUESTS, "slow down"));
//! }
//! ```

mod otp;
mod rate_limit;

pub use otp::{InMemoryOtpStore, OtpEntry, OtpStore};
pub use rate_limit::{RateLimiter, TokenBucketLimiter};

#[cfg(test)]
pub use otp::MockOtpStore;
#[cfg(test)]
pub use rate_limit::MockRateLimiter;

use std::sync::Arc;

/// Collection of all ephemeral stores.
#[derive(Clone)]
pub struct Stores {
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub otp: Arc<dyn OtpStore>,
}
