//! Storage layer for tasklify
//!
//! All persisted state is a handful of JSON documents in a key-value store.
//! Keys are composite ([`StorageKey`]): the namespace plus, for task lists,
//! the owning username. Backends only ever see the rendered key name.
//!
//! # Key space
//!
//! ```text
//! tasklify_user                 # active session record
//! tasklify_profiles             # profile directory (max 5 entries)
//! tasklify_seeded_users         # usernames that already received sample data
//! tasklify_tasks                # legacy global task list (pre per-user storage)
//! tasklify_tasks_<username>     # per-user task list
//! ```
//!
//! # File backend layout
//!
//! ```text
//! <data_dir>/store/
//!   tasklify_user.json
//!   tasklify_tasks_alice.json
//!   tasklify_tasks_alice.json.lock
//!   ...
//! ```

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{Config, StorageBackend};
use crate::error::{Error, Result};
use crate::lock::{self, DEFAULT_LOCK_TIMEOUT_MS};

/// Prefix shared by every key name
pub const KEY_PREFIX: &str = "tasklify";

/// Name of the document directory inside the data directory
pub const STORE_DIR: &str = "store";

const DOCUMENT_EXTENSION: &str = "json";

/// Composite storage key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StorageKey {
    /// Active session record
    Session,
    /// Task list; `owner: None` is the legacy global list
    Tasks { owner: Option<String> },
    /// Profile directory
    Profiles,
    /// Seeded-users marker
    SeededUsers,
}

impl StorageKey {
    pub fn tasks_for(username: &str) -> Self {
        StorageKey::Tasks {
            owner: Some(username.to_string()),
        }
    }

    pub fn legacy_tasks() -> Self {
        StorageKey::Tasks { owner: None }
    }

    /// Namespace component of the key
    pub fn namespace(&self) -> &'static str {
        match self {
            StorageKey::Session => "user",
            StorageKey::Tasks { .. } => "tasks",
            StorageKey::Profiles => "profiles",
            StorageKey::SeededUsers => "seeded_users",
        }
    }

    /// Rendered key name as seen by backends
    pub fn name(&self) -> String {
        match self {
            StorageKey::Tasks { owner: Some(owner) } => {
                format!("{KEY_PREFIX}_{}_{owner}", self.namespace())
            }
            _ => format!("{KEY_PREFIX}_{}", self.namespace()),
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Minimal key-value contract the persistence adapter is written against.
///
/// Values are JSON text. Implementations are used from a single logical
/// session at a time, so methods take `&self`.
pub trait KeyValueStore {
    fn get(&self, key: &StorageKey) -> Result<Option<String>>;

    fn set(&self, key: &StorageKey, value: &str) -> Result<()>;

    fn remove(&self, key: &StorageKey) -> Result<()>;

    fn contains(&self, key: &StorageKey) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &StorageKey) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &StorageKey, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &StorageKey) -> Result<()> {
        (**self).remove(key)
    }

    fn contains(&self, key: &StorageKey) -> Result<bool> {
        (**self).contains(key)
    }
}

// =============================================================================
// In-memory backend
// =============================================================================

/// In-memory store with an optional byte quota.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<BTreeMap<String, String>>,
    quota: Option<u64>,
    disabled: Cell<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes fail once the stored values would exceed `quota` bytes.
    pub fn with_quota(quota: u64) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    /// A store that rejects every operation, like storage disabled by the host.
    pub fn unavailable() -> Self {
        let store = Self::default();
        store.disabled.set(true);
        store
    }

    pub fn set_available(&self, available: bool) {
        self.disabled.set(!available);
    }

    /// Raw write that bypasses the quota; used to plant legacy or corrupt data.
    pub fn insert_raw(&self, key: &StorageKey, value: impl Into<String>) {
        self.entries.borrow_mut().insert(key.name(), value.into());
    }

    pub fn used_bytes(&self) -> u64 {
        self.entries
            .borrow()
            .values()
            .map(|value| value.len() as u64)
            .sum()
    }

    fn check_available(&self) -> Result<()> {
        if self.disabled.get() {
            return Err(Error::OperationFailed("storage unavailable".to_string()));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &StorageKey) -> Result<Option<String>> {
        self.check_available()?;
        Ok(self.entries.borrow().get(&key.name()).cloned())
    }

    fn set(&self, key: &StorageKey, value: &str) -> Result<()> {
        self.check_available()?;
        let name = key.name();
        if let Some(quota) = self.quota {
            let current = self.entries.borrow().get(&name).map_or(0, |v| v.len() as u64);
            let projected = self.used_bytes() - current + value.len() as u64;
            if projected > quota {
                return Err(Error::StorageFull { key: name, quota });
            }
        }
        self.entries.borrow_mut().insert(name, value.to_string());
        Ok(())
    }

    fn remove(&self, key: &StorageKey) -> Result<()> {
        self.check_available()?;
        self.entries.borrow_mut().remove(&key.name());
        Ok(())
    }
}

// =============================================================================
// File backend
// =============================================================================

/// One JSON document per key under `<data_dir>/store/`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    quota: Option<u64>,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root, quota: None }
    }

    pub fn with_quota(mut self, quota: Option<u64>) -> Self {
        self.quota = quota;
        self
    }

    /// Store rooted at `<data_dir>/store`
    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(STORE_DIR))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the document backing `key`
    pub fn document_path(&self, key: &StorageKey) -> PathBuf {
        self.root
            .join(format!("{}.{DOCUMENT_EXTENSION}", escape_file_name(&key.name())))
    }

    fn used_bytes_excluding(&self, skip: &Path) -> Result<u64> {
        if !self.root.exists() {
            return Ok(0);
        }
        let mut total = 0;
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path == skip {
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) == Some(DOCUMENT_EXTENSION) {
                total += fs::metadata(&path)?.len();
            }
        }
        Ok(total)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &StorageKey) -> Result<Option<String>> {
        let path = self.document_path(key);
        if !path.exists() {
            return Ok(None);
        }
        lock::with_document_lock(&path, DEFAULT_LOCK_TIMEOUT_MS, || {
            match fs::read_to_string(&path) {
                Ok(content) => Ok(Some(content)),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(err) => Err(Error::Io(err)),
            }
        })
    }

    fn set(&self, key: &StorageKey, value: &str) -> Result<()> {
        let path = self.document_path(key);
        fs::create_dir_all(&self.root)?;
        lock::with_document_lock(&path, DEFAULT_LOCK_TIMEOUT_MS, || {
            if let Some(quota) = self.quota {
                let projected = self.used_bytes_excluding(&path)? + value.len() as u64;
                if projected > quota {
                    return Err(Error::StorageFull {
                        key: key.name(),
                        quota,
                    });
                }
            }
            lock::write_atomic(&path, value.as_bytes())
        })
    }

    fn remove(&self, key: &StorageKey) -> Result<()> {
        let path = self.document_path(key);
        if !path.exists() {
            return Ok(());
        }
        lock::with_document_lock(&path, DEFAULT_LOCK_TIMEOUT_MS, || {
            match fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(Error::Io(err)),
            }
        })
    }

    fn contains(&self, key: &StorageKey) -> Result<bool> {
        Ok(self.document_path(key).exists())
    }
}

/// Open the backend selected by the configuration.
pub fn open_store(config: &Config, data_dir: &Path) -> Box<dyn KeyValueStore> {
    match config.storage.backend {
        StorageBackend::File => {
            tracing::debug!(data_dir = %data_dir.display(), "opening file store");
            Box::new(FileStore::in_data_dir(data_dir).with_quota(config.storage.quota_bytes))
        }
        StorageBackend::Memory => {
            tracing::debug!("opening in-memory store");
            match config.storage.quota_bytes {
                Some(quota) => Box::new(MemoryStore::with_quota(quota)),
                None => Box::new(MemoryStore::new()),
            }
        }
    }
}

/// Escape a key name into a portable file name.
///
/// ASCII alphanumerics, `-` and `_` pass through; every other byte becomes
/// `%XX`, so distinct usernames never collide on disk.
fn escape_file_name(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            escaped.push(byte as char);
        } else {
            escaped.push_str(&format!("%{byte:02X}"));
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn key_names_match_persisted_layout() {
        assert_eq!(StorageKey::Session.name(), "tasklify_user");
        assert_eq!(StorageKey::Profiles.name(), "tasklify_profiles");
        assert_eq!(StorageKey::SeededUsers.name(), "tasklify_seeded_users");
        assert_eq!(StorageKey::legacy_tasks().name(), "tasklify_tasks");
        assert_eq!(StorageKey::tasks_for("alice").name(), "tasklify_tasks_alice");
    }

    #[test]
    fn escape_keeps_distinct_names_distinct() {
        assert_eq!(escape_file_name("tasklify_tasks_alice"), "tasklify_tasks_alice");
        assert_eq!(escape_file_name("a/b"), "a%2Fb");
        assert_ne!(escape_file_name("a.b"), escape_file_name("a_b"));
    }

    #[test]
    fn memory_store_round_trip_and_remove() {
        let store = MemoryStore::new();
        let key = StorageKey::tasks_for("bob");

        assert!(!store.contains(&key).unwrap());
        store.set(&key, "[]").unwrap();
        assert_eq!(store.get(&key).unwrap().as_deref(), Some("[]"));

        store.remove(&key).unwrap();
        assert!(store.get(&key).unwrap().is_none());
    }

    #[test]
    fn memory_store_quota_rejects_oversized_writes() {
        let store = MemoryStore::with_quota(10);
        let key = StorageKey::Session;

        store.set(&key, "12345").unwrap();
        // Replacing a value only counts the new size.
        store.set(&key, "1234567890").unwrap();
        let err = store.set(&StorageKey::Profiles, "x").unwrap_err();
        assert!(matches!(err, Error::StorageFull { quota: 10, .. }));
    }

    #[test]
    fn unavailable_memory_store_fails_every_call() {
        let store = MemoryStore::unavailable();
        assert!(store.get(&StorageKey::Session).is_err());
        assert!(store.set(&StorageKey::Session, "{}").is_err());

        store.set_available(true);
        assert!(store.get(&StorageKey::Session).unwrap().is_none());
    }

    #[test]
    fn file_store_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::in_data_dir(temp.path());
        let key = StorageKey::tasks_for("alice");

        assert!(store.get(&key).unwrap().is_none());
        store.set(&key, r#"[{"id":"1"}]"#).unwrap();

        assert_eq!(
            store.document_path(&key),
            temp.path().join("store/tasklify_tasks_alice.json")
        );
        assert_eq!(store.get(&key).unwrap().as_deref(), Some(r#"[{"id":"1"}]"#));
        assert!(store.contains(&key).unwrap());

        store.remove(&key).unwrap();
        assert!(!store.contains(&key).unwrap());
        assert!(store.get(&key).unwrap().is_none());
    }

    #[test]
    fn file_store_remove_keeps_lock_file() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::in_data_dir(temp.path());
        let key = StorageKey::tasks_for("alice");
        let lock_path = lock::lock_path_for(&store.document_path(&key));

        store.set(&key, "[]").unwrap();
        store.remove(&key).unwrap();
        // Other handles may still be waiting on this lock file.
        assert!(lock_path.exists());
        assert!(!store.contains(&key).unwrap());

        store.set(&key, "[1]").unwrap();
        assert_eq!(store.get(&key).unwrap().as_deref(), Some("[1]"));
    }

    #[test]
    fn file_store_quota_counts_other_documents() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::in_data_dir(temp.path()).with_quota(Some(16));

        store.set(&StorageKey::Session, "0123456789").unwrap();
        let err = store
            .set(&StorageKey::tasks_for("alice"), "0123456789")
            .unwrap_err();
        assert!(matches!(err, Error::StorageFull { .. }));
        assert!(!store.contains(&StorageKey::tasks_for("alice")).unwrap());
    }
}
