//! Persisted session storage
//!
//! Two keyed entries survive restarts: the bearer credential (`token`) and
//! the serialized profile (`user`). They are always written together and
//! cleared together.
//!
//! File layout (single JSON object, mode 0600 on unix):
//! ```text
//! { "token": "<jwt>", "user": "{\"username\":...}" }
//! ```

use super::model::Session;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Key of the bearer credential entry
pub const TOKEN_KEY: &str = "token";
/// Key of the serialized profile entry
pub const PROFILE_KEY: &str = "user";

/// Key-value storage for the persisted session.
///
/// Synchronous on purpose: callers treat it like browser local storage.
pub trait SessionStorage: Send + Sync {
    /// Read one entry
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write several entries in one step
    fn set_entries(&self, entries: &[(&str, &str)]) -> Result<()>;

    /// Remove several entries in one step
    fn remove_entries(&self, keys: &[&str]) -> Result<()>;
}

/// Persisted pair as found in storage
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedSession {
    pub token: String,
    pub profile: String,
}

/// Write credential and profile together
pub fn save_session(storage: &dyn SessionStorage, session: &Session) -> Result<()> {
    let profile = serde_json::to_string(session)?;
    storage.set_entries(&[(TOKEN_KEY, session.token.as_str()), (PROFILE_KEY, &profile)])
}

/// Read credential and profile; `None` unless both are present
pub fn load_session(storage: &dyn SessionStorage) -> Result<Option<PersistedSession>> {
    let token = storage.get(TOKEN_KEY)?;
    let profile = storage.get(PROFILE_KEY)?;
    Ok(match (token, profile) {
        (Some(token), Some(profile)) => Some(PersistedSession { token, profile }),
        _ => None,
    })
}

/// Clear credential and profile together
pub fn clear_session(storage: &dyn SessionStorage) -> Result<()> {
    storage.remove_entries(&[TOKEN_KEY, PROFILE_KEY])
}

/// Bearer credential currently persisted, if any
pub fn stored_token(storage: &dyn SessionStorage) -> Option<String> {
    match storage.get(TOKEN_KEY) {
        Ok(token) => token.filter(|t| !t.is_empty()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read stored credential");
            None
        }
    }
}

// =============================================================================
// In-memory storage
// =============================================================================

/// In-memory storage (tests, ephemeral sessions)
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| Error::Storage("memory storage poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set_entries(&self, new_entries: &[(&str, &str)]) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Error::Storage("memory storage poisoned".to_string()))?;
        for (key, value) in new_entries {
            entries.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    fn remove_entries(&self, keys: &[&str]) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Error::Storage("memory storage poisoned".to_string()))?;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

// =============================================================================
// File storage
// =============================================================================

/// JSON-file storage shared across CLI invocations
pub struct FileStorage {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(HashMap::new()),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                Error::Storage(format!("Corrupt session file {}: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, entries: &HashMap<String, String>) -> Result<()> {
        if entries.is_empty() {
            return match std::fs::remove_file(&self.path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        restrict_permissions(&tmp)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Entries of a corrupt file are dropped rather than blocking a new login
    fn read_or_reset(&self) -> Result<HashMap<String, String>> {
        match self.read_all() {
            Err(Error::Storage(reason)) => {
                tracing::warn!(%reason, "Discarding unreadable session file");
                Ok(HashMap::new())
            }
            other => other,
        }
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self
            .lock
            .read()
            .map_err(|_| Error::Storage("file storage poisoned".to_string()))?;
        Ok(self.read_or_reset()?.remove(key))
    }

    fn set_entries(&self, new_entries: &[(&str, &str)]) -> Result<()> {
        let _guard = self
            .lock
            .write()
            .map_err(|_| Error::Storage("file storage poisoned".to_string()))?;
        let mut entries = self.read_or_reset()?;
        for (key, value) in new_entries {
            entries.insert(key.to_string(), value.to_string());
        }
        self.write_all(&entries)
    }

    fn remove_entries(&self, keys: &[&str]) -> Result<()> {
        let _guard = self
            .lock
            .write()
            .map_err(|_| Error::Storage("file storage poisoned".to_string()))?;
        let mut entries = self.read_or_reset()?;
        for key in keys {
            entries.remove(*key);
        }
        self.write_all(&entries)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
