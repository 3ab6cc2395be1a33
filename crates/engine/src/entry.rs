//! The entry record and its visibility predicates.

use gossipkv_common::clock;
use std::time::Duration;

/// A single key/value record.
///
/// Entries are never mutated in place once exposed to a reader; every write
/// path installs a fresh value.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: String,
    /// Opaque payload, possibly empty.
    pub value: Vec<u8>,
    /// Tombstone marker. Tombstones replicate like live entries.
    pub archived: bool,
    /// UTC unix seconds, refreshed on every mutation.
    pub last_updated_secs: i64,
    /// `None` means the entry never expires.
    pub expiry: Option<Duration>,
}

impl Entry {
    /// A live entry timestamped now. A zero expiration means no expiry.
    pub fn live(key: impl Into<String>, value: Vec<u8>, expiration: Option<Duration>) -> Self {
        Self {
            key: key.into(),
            value,
            archived: false,
            last_updated_secs: clock::now_unix_secs(),
            expiry: expiration.filter(|d| !d.is_zero()),
        }
    }

    /// Whether the entry has expired at `now_secs`.
    ///
    /// An entry carrying an expiry is expired once the wall clock passes its
    /// last-updated second. The duration itself rides the wire but does not
    /// extend the deadline.
    pub fn is_expired(&self, now_secs: i64) -> bool {
        if self.expiry.is_none() {
            return false;
        }
        if self.last_updated_secs <= 0 {
            return false;
        }
        now_secs > self.last_updated_secs
    }

    /// Whether the entry is visible to readers at `now_secs`.
    pub fn is_visible(&self, now_secs: i64) -> bool {
        !self.archived && !self.is_expired(now_secs)
    }
}
