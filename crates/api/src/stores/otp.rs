//! One-time passcode storage (in memory).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// A pending passcode for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpEntry {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// Store for pending one-time passcodes, keyed by account.
#[cfg_attr(test, mockall::automock)]
pub trait OtpStore: Send + Sync {
    /// Store an entry for the account, replacing any previous one.
    fn put(&self, account: &str, entry: OtpEntry);

    /// Consume the account's entry if `code` matches and it is not past expiry at `now`.
    /// A successful call removes the entry; so does finding it expired.
    fn consume(&self, account: &str, code: &str, now: DateTime<Utc>) -> bool;
}

/// Process-local OtpStore. Expired entries are dropped lazily on lookup.
#[derive(Default)]
pub struct InMemoryOtpStore {
    entries: Mutex<HashMap<String, OtpEntry>>,
}

impl InMemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn get(&self, account: &str) -> Option<OtpEntry> {
        self.entries.lock().get(account).cloned()
    }
}

impl OtpStore for InMemoryOtpStore {
    fn put(&self, account: &str, entry: OtpEntry) {
        self.entries.lock().insert(account.to_owned(), entry);
    }

    fn consume(&self, account: &str, code: &str, now: DateTime<Utc>) -> bool {
        let mut entries = self.entries.lock();

        let Some(entry) = entries.get(account) else {
            return false;
        };

        let expired = now > entry.expires_at;
        let matches = entry.code == code;

        if expired || matches {
            entries.remove(account);
        }

        matches && !expired
    }
}
