//! Local persistent storage
//!
//! A small JSON-file key/value store for client state (last known
//! position, sharing settings) and a token store for credentials.
//! Files live in the XDG data directory (~/.local/share/hobbyhub-nearby/).

use crate::config::Config;
use crate::constants::storage::{
    AUTH_TOKEN_KEY, REFRESH_TOKEN_KEY, SECURE_STORE_FILE_NAME, STORE_FILE_NAME,
};
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Key/value storage for serializable values
pub trait KeyValueStore: Send + Sync {
    /// Read the raw JSON value for a key
    fn get_raw(&self, key: &str) -> Result<Option<serde_json::Value>>;

    /// Overwrite the value for a key
    fn set_raw(&self, key: &str, value: serde_json::Value) -> Result<()>;

    /// Remove a key, returning whether it was present
    fn remove(&self, key: &str) -> Result<bool>;
}

/// Typed helpers over any [`KeyValueStore`]
pub trait KeyValueStoreExt: KeyValueStore {
    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_raw(key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.set_raw(key, serde_json::to_value(value)?)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStoreExt for S {}

impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    fn get_raw(&self, key: &str) -> Result<Option<serde_json::Value>> {
        (**self).get_raw(key)
    }

    fn set_raw(&self, key: &str, value: serde_json::Value) -> Result<()> {
        (**self).set_raw(key, value)
    }

    fn remove(&self, key: &str) -> Result<bool> {
        (**self).remove(key)
    }
}

/// JSON file backed store; the whole map is rewritten on every change
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, serde_json::Value>>,
    restricted: bool,
}

impl FileStore {
    /// Open the general store in the default data directory
    pub fn open_default() -> Result<Self> {
        Self::open(Config::data_dir()?.join(STORE_FILE_NAME))
    }

    /// Open (or lazily create) a store at a specific path
    pub fn open(path: PathBuf) -> Result<Self> {
        Self::open_with(path, false)
    }

    fn open_with(path: PathBuf, restricted: bool) -> Result<Self> {
        let entries = if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| Error::Storage(format!("Failed to read store file: {}", e)))?;
            serde_json::from_str(&content)
                .map_err(|e| Error::Storage(format!("Failed to parse store file: {}", e)))?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
            restricted,
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, serde_json::Value>>> {
        self.entries
            .lock()
            .map_err(|_| Error::Storage("Store lock poisoned".to_string()))
    }

    fn persist(&self, entries: &BTreeMap<String, serde_json::Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Storage(format!("Failed to create store directory: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(entries)?;
        let mut file = open_for_write(&self.path, self.restricted)
            .map_err(|e| Error::Storage(format!("Failed to open store file: {}", e)))?;
        if self.restricted {
            // An existing file keeps its old mode on open; tighten it before writing
            restrict_permissions(&file)?;
        }
        file.write_all(content.as_bytes())
            .map_err(|e| Error::Storage(format!("Failed to write store file: {}", e)))?;
        Ok(())
    }

    /// Apply `change` to a copy of the entries and keep it only if it persisted
    fn update<T>(&self, change: impl FnOnce(&mut BTreeMap<String, serde_json::Value>) -> T) -> Result<T> {
        let mut entries = self.lock()?;
        let mut next = entries.clone();
        let outcome = change(&mut next);
        if next != *entries {
            self.persist(&next)?;
            *entries = next;
        }
        Ok(outcome)
    }
}

impl KeyValueStore for FileStore {
    fn get_raw(&self, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: serde_json::Value) -> Result<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value);
        })
    }

    fn remove(&self, key: &str) -> Result<bool> {
        self.update(|entries| entries.remove(key).is_some())
    }
}

#[cfg(unix)]
fn open_for_write(path: &Path, restricted: bool) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    if restricted {
        options.mode(0o600);
    }
    options.open(path)
}

#[cfg(not(unix))]
fn open_for_write(path: &Path, _restricted: bool) -> std::io::Result<fs::File> {
    fs::File::create(path)
}

#[cfg(unix)]
fn restrict_permissions(file: &fs::File) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
        .map_err(|e| Error::Storage(format!("Failed to restrict store permissions: {}", e)))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &fs::File) -> Result<()> {
    Ok(())
}

/// Credential storage
///
/// On unix the tokens go to an owner-only file. Elsewhere there is no
/// restricted store, so tokens fall back to the general store.
pub struct TokenStore {
    inner: Box<dyn KeyValueStore>,
    secure: bool,
}

impl TokenStore {
    /// Pick the platform-appropriate backing store
    pub fn open(data_dir: &Path, fallback: impl KeyValueStore + 'static) -> Result<Self> {
        if cfg!(unix) {
            let store = FileStore::open_with(data_dir.join(SECURE_STORE_FILE_NAME), true)?;
            Ok(Self {
                inner: Box::new(store),
                secure: true,
            })
        } else {
            warn!("no secure storage on this platform, tokens use the general store");
            Ok(Self::insecure(fallback))
        }
    }

    /// Keep tokens in the given general-purpose store
    pub fn insecure(store: impl KeyValueStore + 'static) -> Self {
        Self {
            inner: Box::new(store),
            secure: false,
        }
    }

    /// Whether tokens are kept in restricted storage
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn access_token(&self) -> Result<Option<String>> {
        self.inner.get(AUTH_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Result<Option<String>> {
        self.inner.get(REFRESH_TOKEN_KEY)
    }

    /// Store a new token pair, replacing the previous one
    pub fn save_tokens(&self, access_token: &str, refresh_token: &str) -> Result<()> {
        self.inner.set(AUTH_TOKEN_KEY, &access_token)?;
        self.inner.set(REFRESH_TOKEN_KEY, &refresh_token)
    }

    pub fn clear(&self) -> Result<()> {
        self.inner.remove(AUTH_TOKEN_KEY)?;
        self.inner.remove(REFRESH_TOKEN_KEY)?;
        Ok(())
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("secure", &self.secure)
            .finish_non_exhaustive()
    }
}

/// In-memory store, for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, serde_json::Value>>,
}

impl KeyValueStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| Error::Storage("Store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: serde_json::Value) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::Storage("Store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::Storage("Store lock poisoned".to_string()))?;
        Ok(entries.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Coordinate;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("store.json");

        {
            let store = FileStore::open(path.clone()).unwrap();
            assert_eq!(store.get::<Coordinate>("pos").unwrap(), None);
            store.set("pos", &Coordinate::new(1.5, 2.5)).unwrap();
        }

        let store = FileStore::open(path).unwrap();
        assert_eq!(
            store.get::<Coordinate>("pos").unwrap(),
            Some(Coordinate::new(1.5, 2.5))
        );
    }

    #[test]
    fn test_file_store_overwrite_and_remove() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path().join("store.json")).unwrap();

        store.set("k", &1u32).unwrap();
        store.set("k", &2u32).unwrap();
        assert_eq!(store.get::<u32>("k").unwrap(), Some(2));

        assert!(store.remove("k").unwrap());
        assert!(!store.remove("k").unwrap());
        assert_eq!(store.get::<u32>("k").unwrap(), None);
    }

    #[test]
    fn test_corrupt_store_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(FileStore::open(path), Err(Error::Storage(_))));
    }

    #[test]
    fn test_token_store() {
        let temp_dir = TempDir::new().unwrap();
        let tokens = TokenStore::open(temp_dir.path(), MemoryStore::default()).unwrap();
        assert_eq!(tokens.is_secure(), cfg!(unix));

        assert_eq!(tokens.access_token().unwrap(), None);
        tokens.save_tokens("access", "refresh").unwrap();
        assert_eq!(tokens.access_token().unwrap().as_deref(), Some("access"));
        assert_eq!(tokens.refresh_token().unwrap().as_deref(), Some("refresh"));

        tokens.clear().unwrap();
        assert_eq!(tokens.refresh_token().unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_secure_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let tokens = TokenStore::open(temp_dir.path(), MemoryStore::default()).unwrap();
        tokens.save_tokens("a", "r").unwrap();

        let mode = fs::metadata(temp_dir.path().join(SECURE_STORE_FILE_NAME))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_secure_file_is_tightened() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(SECURE_STORE_FILE_NAME);
        fs::write(&path, "{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let tokens = TokenStore::open(temp_dir.path(), MemoryStore::default()).unwrap();
        tokens.save_tokens("a", "r").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(fs::read_to_string(&path).unwrap().contains("\"r\""));
    }

    #[test]
    fn test_failed_write_leaves_memory_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        // A file where the store's directory should be makes every write fail
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let store = FileStore::open(blocker.join("store.json")).unwrap();

        assert!(matches!(store.set("k", &1u32), Err(Error::Storage(_))));
        assert_eq!(store.get::<u32>("k").unwrap(), None);
        assert!(!store.remove("k").unwrap());
    }

    #[test]
    fn test_insecure_fallback() {
        let tokens = TokenStore::insecure(MemoryStore::default());
        assert!(!tokens.is_secure());
        tokens.save_tokens("a", "r").unwrap();
        assert_eq!(tokens.access_token().unwrap().as_deref(), Some("a"));
    }

    #[test]
    fn test_shared_store_through_arc() {
        let shared = std::sync::Arc::new(MemoryStore::default());
        let tokens = TokenStore::insecure(std::sync::Arc::clone(&shared));
        tokens.save_tokens("a", "r").unwrap();
        assert_eq!(
            shared.get::<String>(REFRESH_TOKEN_KEY).unwrap().as_deref(),
            Some("r")
        );
    }
}
