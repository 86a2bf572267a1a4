use crate::core::error::StorageError;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Well-known keys in the persisted key-value store
pub mod keys {
    pub const CURRENT_USER: &str = "currentUser";
    pub const FRIENDS_CACHE: &str = "friendsCache";
    pub const LANGUAGE: &str = "language";
    pub const USER_SETTINGS: &str = "userSettings";
    pub const UPDATE_TRIGGER: &str = "user_update_trigger";
    pub const SESSION_VERIFIED: &str = "cf_verified";
    pub const OFFLINE_LICENSE_KEYS: &str = "insideLicenseKeys";
    /// Legacy plaintext user list, purged on startup
    pub const LEGACY_USERS: &str = "insideUsers";
}

/// Persistent string key-value store shared by every service of one profile.
///
/// Last writer wins; there is no locking across processes. Storage is assumed
/// to be always available, so operations do not report failures.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Volatile storage, used for session-scoped flags and in tests
#[derive(Default)]
pub struct MemoryStorage {
    entries: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}

/// Storage persisted as a single JSON object on disk.
///
/// The whole map is kept in memory and rewritten through a temporary file on
/// every mutation, so a crash never leaves a half-written file behind.
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();

        let entries = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn mutate(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        f(&mut entries);

        if let Err(e) = self.persist(&entries) {
            warn!(path = %self.path.display(), error = %e, "Failed to persist storage");
        }
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        let entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string());
        });
    }

    fn remove(&self, key: &str) {
        self.mutate(|entries| {
            entries.remove(key);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        assert!(storage.is_empty());

        storage.set(keys::LANGUAGE, "en");
        assert_eq!(storage.get(keys::LANGUAGE).as_deref(), Some("en"));

        storage.set(keys::LANGUAGE, "ru");
        assert_eq!(storage.get(keys::LANGUAGE).as_deref(), Some("ru"));
        assert_eq!(storage.len(), 1);

        storage.remove(keys::LANGUAGE);
        assert!(storage.get(keys::LANGUAGE).is_none());
    }

    #[test]
    fn test_file_storage_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profile").join("storage.json");

        {
            let storage = FileStorage::open(&path).unwrap();
            storage.set(keys::CURRENT_USER, r#"{"id":1}"#);
            storage.set(keys::LANGUAGE, "en");
            storage.remove(keys::LANGUAGE);
        }

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get(keys::CURRENT_USER).as_deref(), Some(r#"{"id":1}"#));
        assert!(reopened.get(keys::LANGUAGE).is_none());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_file_storage_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(FileStorage::open(&path), Err(StorageError::Serialization(_))));
    }

    #[test]
    fn test_file_storage_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "").unwrap();

        let storage = FileStorage::open(&path).unwrap();
        assert!(storage.get(keys::CURRENT_USER).is_none());
    }
}
