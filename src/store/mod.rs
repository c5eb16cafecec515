//! Persistent, synchronous key-value store.
//!
//! [`KeyValueStore`] sits in front of a [`StoreBackend`] and applies the
//! value policy shared by every caller:
//! - strings are stored verbatim, every other value as JSON text
//! - booleans and numbers have typed accessors using native storage
//! - backend and decode failures are logged and swallowed, reads fall back
//!   to the caller's default
//!
//! Use [`KeyValueStore::try_get`] when a decode failure must be observed.

mod backend;
mod memory;
mod noop;
mod sqlite;

pub use backend::{StoreBackend, StoreError, StoredValue};
pub use memory::MemoryBackend;
pub use noop::NoopBackend;
pub use sqlite::SqliteBackend;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

/// String-keyed store with typed accessors and a silent-degrade policy.
pub struct KeyValueStore {
  backend: Box<dyn StoreBackend>,
}

impl KeyValueStore {
  /// Create a store over the given backend.
  pub fn new(backend: impl StoreBackend + 'static) -> Self {
    Self {
      backend: Box::new(backend),
    }
  }

  /// Create a fresh store that lives in memory only.
  pub fn in_memory() -> Self {
    Self::new(MemoryBackend::new())
  }

  /// Persist `value` under `key`.
  ///
  /// A value that serializes to a JSON string is stored verbatim; anything
  /// else is stored as its JSON encoding.
  pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
    let stored = match serde_json::to_value(value) {
      Ok(Value::String(s)) => StoredValue::Text(s),
      Ok(other) => StoredValue::Text(other.to_string()),
      Err(source) => {
        let e = StoreError::Encode {
          key: key.to_string(),
          source,
        };
        error!("Error storing data for key {}: {}", key, e);
        return;
      }
    };
    self.write(key, stored);
  }

  /// Persist a raw string under `key`.
  pub fn set_string(&self, key: &str, value: &str) {
    self.write(key, StoredValue::Text(value.to_string()));
  }

  /// Read and decode the value at `key`.
  ///
  /// Returns `Ok(None)` when the key is absent and `Err` when the backend
  /// fails or the stored text can't be decoded as `T`.
  pub fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
    let stored = match self.backend.read(key)? {
      Some(stored) => stored,
      None => return Ok(None),
    };

    let decoded = match stored {
      StoredValue::Text(raw) => match serde_json::from_str(&raw) {
        Ok(v) => v,
        // Strings are stored verbatim, so retry the raw text as a JSON string
        Err(source) => serde_json::from_value(Value::String(raw)).map_err(|_| {
          StoreError::Decode {
            key: key.to_string(),
            source,
          }
        })?,
      },
      StoredValue::Bool(b) => {
        serde_json::from_value(Value::Bool(b)).map_err(|source| StoreError::Decode {
          key: key.to_string(),
          source,
        })?
      }
      StoredValue::Number(n) => {
        let number = serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null);
        serde_json::from_value(number).map_err(|source| StoreError::Decode {
          key: key.to_string(),
          source,
        })?
      }
    };

    Ok(Some(decoded))
  }

  /// Read the value at `key`, or `None` if it is absent or unreadable.
  pub fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    match self.try_get(key) {
      Ok(value) => value,
      Err(e) => {
        warn!("Error retrieving data for key {}: {}", key, e);
        None
      }
    }
  }

  /// Read the value at `key`, or `default` if it is absent or unreadable.
  pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
    self.get_opt(key).unwrap_or(default)
  }

  /// Read the raw text at `key` without decoding it.
  pub fn get_string(&self, key: &str, default: &str) -> String {
    match self.backend.read(key) {
      Ok(Some(StoredValue::Text(raw))) => raw,
      Ok(Some(other)) => {
        debug!("Key {} holds a {}, returning default", key, other.kind());
        default.to_string()
      }
      Ok(None) => default.to_string(),
      Err(e) => {
        warn!("Error retrieving string for key {}: {}", key, e);
        default.to_string()
      }
    }
  }

  pub fn get_bool(&self, key: &str, default: bool) -> bool {
    match self.backend.read(key) {
      Ok(Some(StoredValue::Bool(b))) => b,
      Ok(_) => default,
      Err(e) => {
        warn!("Error retrieving boolean for key {}: {}", key, e);
        default
      }
    }
  }

  pub fn set_bool(&self, key: &str, value: bool) {
    self.write(key, StoredValue::Bool(value));
  }

  pub fn get_number(&self, key: &str, default: f64) -> f64 {
    match self.backend.read(key) {
      Ok(Some(StoredValue::Number(n))) => n,
      Ok(_) => default,
      Err(e) => {
        warn!("Error retrieving number for key {}: {}", key, e);
        default
      }
    }
  }

  /// Persist a number. Non-finite values can't be stored and are dropped.
  pub fn set_number(&self, key: &str, value: f64) {
    if !value.is_finite() {
      warn!("Refusing to store non-finite number {} for key {}", value, key);
      return;
    }
    self.write(key, StoredValue::Number(value));
  }

  /// Delete `key`. No-op if absent.
  pub fn remove(&self, key: &str) {
    if let Err(e) = self.backend.delete(key) {
      warn!("Error removing key {}: {}", key, e);
    }
  }

  pub fn contains(&self, key: &str) -> bool {
    self.backend.contains(key).unwrap_or_else(|e| {
      warn!("Error checking key {}: {}", key, e);
      false
    })
  }

  /// Delete every key in the store, cache or not.
  pub fn clear(&self) {
    if let Err(e) = self.backend.clear() {
      error!("Error clearing storage: {}", e);
    }
  }

  pub fn all_keys(&self) -> Vec<String> {
    self.backend.keys().unwrap_or_else(|e| {
      warn!("Error getting all keys: {}", e);
      Vec::new()
    })
  }

  /// Total persisted size in bytes. Diagnostic only.
  pub fn size(&self) -> u64 {
    self.backend.size_bytes().unwrap_or_else(|e| {
      warn!("Error getting storage size: {}", e);
      0
    })
  }

  /// Tear the store down, releasing the backend.
  pub fn close(self) {
    if let Err(e) = self.backend.close() {
      warn!("Error closing storage: {}", e);
    }
  }

  fn write(&self, key: &str, value: StoredValue) {
    if let Err(e) = self.backend.write(key, value) {
      error!("Error storing data for key {}: {}", key, e);
    }
  }
}
