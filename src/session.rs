//! Persisted JWT session storage.

use color_eyre::{eyre::eyre, Result};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::warn;

/// Where the bearer token lives between runs.
///
/// One fixed slot with get/set/clear semantics. Set and clear are
/// infallible on purpose: the in-memory token stays authoritative, and a
/// store that cannot write only costs persistence across restarts.
pub trait TokenStore: Send + Sync {
  fn get(&self) -> Option<String>;
  fn set(&self, token: &str);
  fn clear(&self);
}

/// Token persisted as a single file under the platform data directory.
pub struct FileTokenStore {
  path: PathBuf,
}

impl FileTokenStore {
  /// Open the store at the default location, creating parent directories.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;

    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create session directory: {}", e))?;
    }

    Ok(Self { path })
  }

  /// Open the store at an explicit path.
  pub fn at(path: PathBuf) -> Self {
    Self { path }
  }

  /// Get the default token path.
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("kelime").join("token"))
  }
}

impl TokenStore for FileTokenStore {
  fn get(&self) -> Option<String> {
    fs::read_to_string(&self.path)
      .ok()
      .map(|s| s.trim().to_string())
      .filter(|s| !s.is_empty())
  }

  fn set(&self, token: &str) {
    if let Err(e) = fs::write(&self.path, token) {
      warn!("failed to persist token to {}: {}", self.path.display(), e);
    }
  }

  fn clear(&self) {
    match fs::remove_file(&self.path) {
      Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
        warn!("failed to remove token at {}: {}", self.path.display(), e);
      }
      _ => {}
    }
  }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryTokenStore {
  token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl TokenStore for MemoryTokenStore {
  fn get(&self) -> Option<String> {
    self.token.lock().ok().and_then(|t| t.clone())
  }

  fn set(&self, token: &str) {
    if let Ok(mut held) = self.token.lock() {
      *held = Some(token.to_string());
    }
  }

  fn clear(&self) {
    if let Ok(mut held) = self.token.lock() {
      *held = None;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_memory_store_roundtrip() {
    let store = MemoryTokenStore::new();
    assert_eq!(store.get(), None);

    store.set("abc123");
    assert_eq!(store.get(), Some("abc123".to_string()));

    store.clear();
    assert_eq!(store.get(), None);
  }

  #[test]
  fn test_file_store_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::at(dir.path().join("token"));

    assert_eq!(store.get(), None);

    store.set("eyJhbGciOiJIUzI1NiJ9");
    assert_eq!(store.get(), Some("eyJhbGciOiJIUzI1NiJ9".to_string()));

    store.clear();
    assert_eq!(store.get(), None);
  }

  #[test]
  fn test_file_store_clear_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::at(dir.path().join("token"));

    store.clear();
    store.clear();
    assert_eq!(store.get(), None);
  }

  #[test]
  fn test_file_store_ignores_surrounding_whitespace() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("token");
    fs::write(&path, "tok\n").unwrap();

    let store = FileTokenStore::at(path);
    assert_eq!(store.get(), Some("tok".to_string()));
  }
}
