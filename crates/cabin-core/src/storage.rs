//! Key/value persistence port for overlays and the session.
//!
//! Values are JSON strings stored under fixed keys. [`MemoryStore`] backs
//! tests; [`FileStore`] keeps one `<key>.json` file per key in a state
//! directory and serializes mutations on an advisory lock.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ErrorCode;
use crate::lock::{DEFAULT_LOCK_TIMEOUT, LockError, StoreLock};

/// Errors raised by a [`KvStore`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Lock(#[from] LockError),
}

impl StorageError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } | Self::Encode { .. } => ErrorCode::StorageWriteFailed,
            Self::Lock(err) => err.code(),
        }
    }
}

/// The persistence port: string values under string keys.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Hold an exclusive lock across a read-modify-write cycle, if the
    /// backend can be shared between processes.
    fn lock(&self) -> Result<Option<StoreLock>, StorageError> {
        Ok(None)
    }
}

pub type SharedStore = Arc<dyn KvStore>;

/// Read and decode `key`, falling back to `T::default()` when the key is
/// missing or its content does not parse.
pub fn load_or_default<T: DeserializeOwned + Default>(
    store: &dyn KvStore,
    key: &str,
) -> Result<T, StorageError> {
    let Some(raw) = store.get(key)? else {
        return Ok(T::default());
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(value),
        Err(err) => {
            warn!(key, %err, "discarding malformed persisted value");
            Ok(T::default())
        }
    }
}

/// Read and decode `key`, returning `None` when missing or malformed.
pub fn load_optional<T: DeserializeOwned>(
    store: &dyn KvStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            warn!(key, %err, "discarding malformed persisted value");
            Ok(None)
        }
    }
}

/// Encode `value` and write it under `key` in one call.
pub fn save<T: Serialize>(store: &dyn KvStore, key: &str, value: &T) -> Result<(), StorageError> {
    let encoded = serde_json::to_string(value).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &encoded)
}

/// In-process store. Cheap to construct; nothing outlives the value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// Directory-backed store: `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    lock_timeout: Duration,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }

    fn io_error(path: &Path, source: io::Error) -> StorageError {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Self::io_error(&path, err)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(|err| Self::io_error(&self.dir, err))?;
        let path = self.path_for(key);
        // Write to a sibling then rename so readers never see a torn file.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(|err| Self::io_error(&tmp, err))?;
        fs::rename(&tmp, &path).map_err(|err| Self::io_error(&path, err))?;
        debug!(key, path = %path.display(), bytes = value.len(), "persisted");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Self::io_error(&path, err)),
        }
    }

    fn lock(&self) -> Result<Option<StoreLock>, StorageError> {
        Ok(Some(StoreLock::acquire(
            &self.dir.join(".lock"),
            self.lock_timeout,
        )?))
    }
}
