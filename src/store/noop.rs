use super::backend::{StoreBackend, StoreError, StoredValue};

/// Backend that doesn't store anything.
/// Used when caching is disabled - all writes are discarded and all reads miss.
pub struct NoopBackend;

impl StoreBackend for NoopBackend {
  fn read(&self, _key: &str) -> Result<Option<StoredValue>, StoreError> {
    Ok(None) // Always miss
  }

  fn write(&self, _key: &str, _value: StoredValue) -> Result<(), StoreError> {
    Ok(()) // Discard
  }

  fn delete(&self, _key: &str) -> Result<(), StoreError> {
    Ok(())
  }

  fn clear(&self) -> Result<(), StoreError> {
    Ok(())
  }

  fn keys(&self) -> Result<Vec<String>, StoreError> {
    Ok(Vec::new())
  }

  fn size_bytes(&self) -> Result<u64, StoreError> {
    Ok(0)
  }
}
