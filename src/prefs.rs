//! Persisted user preferences.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tracing::warn;

use crate::catalog::FetchLimit;

/// Key holding the user's fetch limit
pub const FETCH_LIMIT_KEY: &str = "fetch_limit";

/// Small synchronous key-value store
pub trait PreferenceStore: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<String>>;
  fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Preferences kept in a SQLite table
pub struct SqlitePreferences {
  conn: Mutex<Connection>,
}

const PREFS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS preferences (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

impl SqlitePreferences {
  /// Open or create the store at `path`
  pub fn open(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create preferences directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open preferences at {}: {}", path.display(), e))?;
    Self::with_connection(conn)
  }

  pub fn in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory preferences: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    conn
      .execute_batch(PREFS_SCHEMA)
      .map_err(|e| eyre!("Failed to run preferences migrations: {}", e))?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }
}

impl PreferenceStore for SqlitePreferences {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
    conn
      .query_row(
        "SELECT value FROM preferences WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read preference {}: {}", key, e))
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
    conn
      .execute(
        "INSERT INTO preferences (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
      )
      .map_err(|e| eyre!("Failed to write preference {}: {}", key, e))?;
    Ok(())
  }
}

/// Process-local preferences, used when persistence is unavailable
#[derive(Debug, Default)]
pub struct MemoryPreferences {
  values: Mutex<HashMap<String, String>>,
}

impl MemoryPreferences {
  pub fn new() -> Self {
    Self::default()
  }
}

impl PreferenceStore for MemoryPreferences {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
    Ok(values.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
    values.insert(key.to_string(), value.to_string());
    Ok(())
  }
}

/// The stored fetch limit, or `default` when missing, unreadable or invalid.
pub fn load_fetch_limit(store: &dyn PreferenceStore, default: FetchLimit) -> FetchLimit {
  match store.get(FETCH_LIMIT_KEY) {
    Ok(Some(raw)) => match raw.parse::<FetchLimit>() {
      Ok(limit) => limit,
      Err(e) => {
        warn!(value = %raw, error = %e, "ignoring stored fetch limit");
        default
      }
    },
    Ok(None) => default,
    Err(e) => {
      warn!(error = %e, "could not read fetch limit preference");
      default
    }
  }
}

pub fn save_fetch_limit(store: &dyn PreferenceStore, limit: FetchLimit) -> Result<()> {
  store.set(FETCH_LIMIT_KEY, &limit.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn default_limit() -> FetchLimit {
    FetchLimit::new(1000).unwrap()
  }

  #[test]
  fn test_memory_roundtrip() {
    let store = MemoryPreferences::new();
    assert_eq!(store.get("x").unwrap(), None);
    store.set("x", "1").unwrap();
    store.set("x", "2").unwrap();
    assert_eq!(store.get("x").unwrap().as_deref(), Some("2"));
  }

  #[test]
  fn test_sqlite_upsert() {
    let store = SqlitePreferences::in_memory().unwrap();
    store.set(FETCH_LIMIT_KEY, "500").unwrap();
    store.set(FETCH_LIMIT_KEY, "250").unwrap();
    assert_eq!(store.get(FETCH_LIMIT_KEY).unwrap().as_deref(), Some("250"));
  }

  #[test]
  fn test_fetch_limit_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("prefs.db");

    {
      let store = SqlitePreferences::open(&path).unwrap();
      save_fetch_limit(&store, FetchLimit::new(250).unwrap()).unwrap();
    }

    let store = SqlitePreferences::open(&path).unwrap();
    assert_eq!(load_fetch_limit(&store, default_limit()).get(), 250);
  }

  #[test]
  fn test_missing_fetch_limit_uses_default() {
    let store = MemoryPreferences::new();
    assert_eq!(load_fetch_limit(&store, default_limit()), default_limit());
  }

  #[test]
  fn test_invalid_stored_fetch_limit_uses_default() {
    let store = MemoryPreferences::new();
    for bad in ["0", "-5", "abc", ""] {
      store.set(FETCH_LIMIT_KEY, bad).unwrap();
      assert_eq!(load_fetch_limit(&store, default_limit()), default_limit());
    }
  }
}
