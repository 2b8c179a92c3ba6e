//! One-time passcodes for the email second factor.
//!
//! A code is six random digits (leading zeros kept), valid for one verification
//! within its expiry window. Requesting a new code replaces the old one.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::Rng;

use crate::{
    services::EmailSender,
    stores::{OtpEntry, OtpStore},
};

#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("invalid or expired code")]
    InvalidOrExpired,
    #[error("failed to deliver code")]
    Delivery(#[source] anyhow::Error),
}

/// Generates, delivers and checks one-time passcodes.
#[derive(Clone)]
pub struct OtpManager {
    store: Arc<dyn OtpStore>,
    email: Arc<dyn EmailSender>,
    ttl: Duration,
}

impl OtpManager {
    pub fn new(store: Arc<dyn OtpStore>, email: Arc<dyn EmailSender>, ttl: Duration) -> Self {
        Self { store, email, ttl }
    }

    /// Issue a fresh code for `account` and email it to `address`.
    /// Returns the code that was sent.
    pub async fn issue_code(&self, account: &str, address: &str) -> Result<String, OtpError> {
        let code = generate_code();

        self.store.put(
            account,
            OtpEntry {
                code: code.clone(),
                expires_at: Utc::now() + self.ttl,
            },
        );

        self.email
            .send_otp_code(address, &code, self.ttl)
            .await
            .map_err(OtpError::Delivery)?;

        Ok(code)
    }

    /// Check and consume the account's pending code.
    pub fn verify_code(&self, account: &str, code: &str) -> Result<(), OtpError> {
        if self.store.consume(account, code, Utc::now()) {
            Ok(())
        } else {
            Err(OtpError::InvalidOrExpired)
        }
    }
}

fn generate_code() -> String {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("{n:06}")
}
