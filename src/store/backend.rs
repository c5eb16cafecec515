//! Storage backend trait and the value shapes it persists.

use thiserror::Error;

/// Errors raised by a storage backend.
///
/// These never reach consumers of [`KeyValueStore`](super::KeyValueStore);
/// the store logs them and degrades to a default.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("storage backend error: {0}")]
  Backend(String),

  #[error("failed to encode value for key {key}: {source}")]
  Encode {
    key: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to decode value for key {key}: {source}")]
  Decode {
    key: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("storage lock poisoned")]
  Poisoned,
}

impl From<rusqlite::Error> for StoreError {
  fn from(e: rusqlite::Error) -> Self {
    StoreError::Backend(e.to_string())
  }
}

/// A value as it sits in the backend.
///
/// Booleans and numbers keep their native shape; everything else is text
/// (either a raw string or a JSON document).
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
  Text(String),
  Bool(bool),
  Number(f64),
}

impl StoredValue {
  /// Short name of the variant, also used as the persisted kind tag.
  pub fn kind(&self) -> &'static str {
    match self {
      StoredValue::Text(_) => "text",
      StoredValue::Bool(_) => "bool",
      StoredValue::Number(_) => "number",
    }
  }

  /// Number of bytes this value occupies once persisted.
  pub fn byte_len(&self) -> usize {
    match self {
      StoredValue::Text(s) => s.len(),
      StoredValue::Bool(_) => 1,
      StoredValue::Number(_) => 8,
    }
  }
}

/// Trait for persistence backends behind the key-value store.
///
/// Implementations must be usable from any thread; mutual exclusion is the
/// backend's own business.
pub trait StoreBackend: Send + Sync {
  /// Read the value stored under `key`.
  fn read(&self, key: &str) -> Result<Option<StoredValue>, StoreError>;

  /// Write `value` under `key`, replacing whatever was there.
  fn write(&self, key: &str, value: StoredValue) -> Result<(), StoreError>;

  /// Delete `key`. Deleting an absent key succeeds.
  fn delete(&self, key: &str) -> Result<(), StoreError>;

  /// Check whether `key` exists.
  fn contains(&self, key: &str) -> Result<bool, StoreError> {
    Ok(self.read(key)?.is_some())
  }

  /// Delete every key.
  fn clear(&self) -> Result<(), StoreError>;

  /// All keys currently persisted, in no particular order.
  fn keys(&self) -> Result<Vec<String>, StoreError>;

  /// Total persisted size in bytes.
  fn size_bytes(&self) -> Result<u64, StoreError>;

  /// Release resources held by the backend.
  fn close(&self) -> Result<(), StoreError> {
    Ok(())
  }
}
