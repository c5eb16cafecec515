//! SQLite-backed persistent storage.

use color_eyre::{eyre::eyre, Result};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::backend::{StoreBackend, StoreError, StoredValue};

/// Schema for the key-value table.
///
/// `value` has no declared type so SQLite keeps integers, reals and text in
/// their native storage classes.
const STORE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY NOT NULL,
    kind TEXT NOT NULL,
    value
);
"#;

/// SQLite-based key-value backend.
pub struct SqliteBackend {
  conn: Mutex<Option<Connection>>,
}

impl SqliteBackend {
  /// Open the store at the default location.
  pub fn open_default() -> Result<Self> {
    Self::open(&Self::default_path()?)
  }

  /// Open (or create) the store at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create storage directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open store at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Open a throwaway store that lives only as long as this value.
  pub fn open_in_memory() -> Result<Self> {
    let conn =
      Connection::open_in_memory().map_err(|e| eyre!("Failed to open in-memory store: {}", e))?;
    Self::with_connection(conn)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("ipo-cache").join("store.db"))
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    conn
      .execute_batch(STORE_SCHEMA)
      .map_err(|e| eyre!("Failed to run store migrations: {}", e))?;

    Ok(Self {
      conn: Mutex::new(Some(conn)),
    })
  }

  fn lock(&self) -> Result<MutexGuard<'_, Option<Connection>>, StoreError> {
    self.conn.lock().map_err(|_| StoreError::Poisoned)
  }
}

/// Run `f` against the open connection, failing if the store was closed.
fn with_conn<T>(
  guard: &MutexGuard<'_, Option<Connection>>,
  f: impl FnOnce(&Connection) -> Result<T, StoreError>,
) -> Result<T, StoreError> {
  match guard.as_ref() {
    Some(conn) => f(conn),
    None => Err(StoreError::Backend("store is closed".to_string())),
  }
}

fn decode_row(kind: &str, value: Value) -> Result<StoredValue, StoreError> {
  match (kind, value) {
    ("text", Value::Text(s)) => Ok(StoredValue::Text(s)),
    ("bool", Value::Integer(i)) => Ok(StoredValue::Bool(i != 0)),
    ("number", Value::Real(f)) => Ok(StoredValue::Number(f)),
    ("number", Value::Integer(i)) => Ok(StoredValue::Number(i as f64)),
    (kind, other) => Err(StoreError::Backend(format!(
      "unexpected {:?} stored for kind {}",
      other.data_type(),
      kind
    ))),
  }
}

fn encode_value(value: StoredValue) -> Value {
  match value {
    StoredValue::Text(s) => Value::Text(s),
    StoredValue::Bool(b) => Value::Integer(b as i64),
    StoredValue::Number(f) => Value::Real(f),
  }
}

impl StoreBackend for SqliteBackend {
  fn read(&self, key: &str) -> Result<Option<StoredValue>, StoreError> {
    let guard = self.lock()?;
    with_conn(&guard, |conn| {
      let row: Option<(String, Value)> = conn
        .query_row(
          "SELECT kind, value FROM kv_store WHERE key = ?",
          params![key],
          |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

      row
        .map(|(kind, value)| decode_row(&kind, value))
        .transpose()
    })
  }

  fn write(&self, key: &str, value: StoredValue) -> Result<(), StoreError> {
    let guard = self.lock()?;
    with_conn(&guard, |conn| {
      let kind = value.kind();
      conn.execute(
        "INSERT OR REPLACE INTO kv_store (key, kind, value) VALUES (?, ?, ?)",
        params![key, kind, encode_value(value)],
      )?;
      Ok(())
    })
  }

  fn delete(&self, key: &str) -> Result<(), StoreError> {
    let guard = self.lock()?;
    with_conn(&guard, |conn| {
      conn.execute("DELETE FROM kv_store WHERE key = ?", params![key])?;
      Ok(())
    })
  }

  fn contains(&self, key: &str) -> Result<bool, StoreError> {
    let guard = self.lock()?;
    with_conn(&guard, |conn| {
      let found: Option<i64> = conn
        .query_row(
          "SELECT 1 FROM kv_store WHERE key = ?",
          params![key],
          |row| row.get(0),
        )
        .optional()?;
      Ok(found.is_some())
    })
  }

  fn clear(&self) -> Result<(), StoreError> {
    let guard = self.lock()?;
    with_conn(&guard, |conn| {
      conn.execute("DELETE FROM kv_store", [])?;
      Ok(())
    })
  }

  fn keys(&self) -> Result<Vec<String>, StoreError> {
    let guard = self.lock()?;
    with_conn(&guard, |conn| {
      let mut stmt = conn.prepare("SELECT key FROM kv_store")?;
      let keys = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
      Ok(keys)
    })
  }

  fn size_bytes(&self) -> Result<u64, StoreError> {
    let guard = self.lock()?;
    with_conn(&guard, |conn| {
      // Same accounting as StoredValue::byte_len
      let size: i64 = conn.query_row(
        "SELECT COALESCE(SUM(
           LENGTH(CAST(key AS BLOB)) +
           CASE kind
             WHEN 'text' THEN LENGTH(CAST(value AS BLOB))
             WHEN 'bool' THEN 1
             ELSE 8
           END
         ), 0) FROM kv_store",
        [],
        |row| row.get(0),
      )?;
      Ok(size.max(0) as u64)
    })
  }

  fn close(&self) -> Result<(), StoreError> {
    let mut guard = self.lock()?;
    match guard.take() {
      Some(conn) => conn.close().map_err(|(_, e)| StoreError::from(e)),
      None => Ok(()),
    }
  }
}
