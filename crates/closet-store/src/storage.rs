//! # Durable Key-Value Storage
//!
//! Every persisted value in the stack (collections, search history,
//! notification read-state, snapshot cache) goes through one
//! [`KeyValueStore`], injected into each consumer. Values are JSON strings.
//!
//! The namespace is shared by key across all consumers. Writers in separate
//! processes are not coordinated: last write wins.
//!
//! ## Implementations
//!
//! - [`MemoryStorage`] — in-process map, optionally bounded by a byte quota.
//! - [`FileStorage`] — one `<key>.json` file per key under a directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use closet_core::StorageError;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Durable string-keyed storage.
///
/// All operations are synchronous and must not be called while holding a
/// lock across an `.await` point.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Read and deserialize a JSON value.
pub fn read_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.get(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Serialization {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Serialize and write a JSON value, overwriting whatever was stored.
pub fn write_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Serialization {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &raw)
}

// -- In-memory ----------------------------------------------------------------

/// Thread-safe in-memory storage.
///
/// `parking_lot::RwLock` is non-poisonable; a panicking writer does not
/// permanently corrupt the map.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: RwLock<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects writes once the total stored bytes would exceed
    /// `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            quota: Some(bytes),
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self.data.write();
        if let Some(quota) = self.quota {
            let others: usize = guard
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = key.len() + value.len();
            let available = quota.saturating_sub(others);
            if needed > available {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    available,
                });
            }
        }
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.data.write().remove(key);
        Ok(())
    }
}

// -- Filesystem ---------------------------------------------------------------

/// Directory-backed storage: key `cart` lives in `<root>/cart.json`.
///
/// Characters outside `[A-Za-z0-9_-]` in a key are replaced by `_` when
/// forming the file name.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Open (creating if needed) a storage directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(|source| StorageError::Io {
            key: root.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.root.join(format!("{file}.json"))
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        // Temp file + rename: readers never observe a partial value.
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };
        std::fs::write(&tmp, value).map_err(io_err)?;
        std::fs::rename(&tmp, &path).map_err(io_err)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}
