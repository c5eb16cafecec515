//! In-process storage, used for tests and ephemeral sessions.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::backend::{StoreBackend, StoreError, StoredValue};

/// Backend holding everything in a `HashMap`.
#[derive(Default)]
pub struct MemoryBackend {
  data: Mutex<HashMap<String, StoredValue>>,
}

impl MemoryBackend {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, StoredValue>>, StoreError> {
    self.data.lock().map_err(|_| StoreError::Poisoned)
  }
}

impl StoreBackend for MemoryBackend {
  fn read(&self, key: &str) -> Result<Option<StoredValue>, StoreError> {
    Ok(self.lock()?.get(key).cloned())
  }

  fn write(&self, key: &str, value: StoredValue) -> Result<(), StoreError> {
    self.lock()?.insert(key.to_string(), value);
    Ok(())
  }

  fn delete(&self, key: &str) -> Result<(), StoreError> {
    self.lock()?.remove(key);
    Ok(())
  }

  fn contains(&self, key: &str) -> Result<bool, StoreError> {
    Ok(self.lock()?.contains_key(key))
  }

  fn clear(&self) -> Result<(), StoreError> {
    self.lock()?.clear();
    Ok(())
  }

  fn keys(&self) -> Result<Vec<String>, StoreError> {
    Ok(self.lock()?.keys().cloned().collect())
  }

  fn size_bytes(&self) -> Result<u64, StoreError> {
    let size = self
      .lock()?
      .iter()
      .map(|(k, v)| (k.len() + v.byte_len()) as u64)
      .sum();
    Ok(size)
  }
}
