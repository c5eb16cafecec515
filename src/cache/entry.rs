use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Wrapper persisted around every cached value.
///
/// Both timestamps are epoch milliseconds; `expires_at` is fixed at
/// `timestamp + ttl` when the entry is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
  /// The cached data
  pub data: T,
  /// When the data was cached
  pub timestamp: i64,
  /// When the entry stops being valid
  pub expires_at: i64,
}

impl<T> CacheEntry<T> {
  /// Build an entry stamped at `now_millis` that lives for `ttl`.
  pub fn new(data: T, now_millis: i64, ttl: Duration) -> Self {
    Self {
      data,
      timestamp: now_millis,
      expires_at: now_millis.saturating_add(ttl.num_milliseconds()),
    }
  }

  /// An entry is valid up to and including its expiry instant.
  pub fn is_valid_at(&self, now_millis: i64) -> bool {
    now_millis <= self.expires_at
  }

  pub fn is_expired_at(&self, now_millis: i64) -> bool {
    !self.is_valid_at(now_millis)
  }
}

/// Header of a cache entry, used when sweeping without knowing the payload type.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EntryHeader {
  pub expires_at: i64,
}
