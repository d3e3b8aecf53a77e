//! The [`Storage`] trait and its two implementations.
//!
//! The API deliberately mirrors browser local storage: string keys,
//! string values, synchronous calls. Nothing here caches: every read goes
//! to the backing store, so a write made by one reader is visible to any
//! other reader of the same storage on its next call.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tempfile::NamedTempFile;

use crate::StoreError;

/// A durable string key-value store.
///
/// # Trait bounds
///
/// `Send + Sync + 'static` because the store is owned by the guard's actor
/// task, which Tokio may move between worker threads.
pub trait Storage: Send + Sync + 'static {
    /// Returns the value stored under `key`, or `None` if it was never set
    /// (or was removed).
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StoreError>;

    /// Lists every key currently stored.
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Sharing a storage between the token store and other readers (a second
/// "tab", a test assertion) is just an `Arc`.
impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove_item(key)
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        (**self).keys()
    }
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// In-process storage. Loses everything when dropped.
///
/// Can be switched off with [`set_available`](Self::set_available) to
/// simulate a browser with storage disabled.
#[derive(Debug)]
pub struct MemoryStorage {
    items: Mutex<BTreeMap<String, String>>,
    available: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(BTreeMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Makes every subsequent call fail with [`StoreError::Unavailable`]
    /// (`false`) or succeed again (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_items<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>) -> T,
    ) -> Result<T, StoreError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "memory storage disabled".into(),
            ));
        }
        let mut items = self.items.lock().map_err(|_| {
            StoreError::Unavailable("memory storage lock poisoned".into())
        })?;
        Ok(f(&mut items))
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.with_items(|items| items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.with_items(|items| {
            items.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.with_items(|items| {
            items.remove(key);
        })
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.with_items(|items| items.keys().cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// FileStorage
// ---------------------------------------------------------------------------

/// Storage backed by a single JSON object file.
///
/// The file holds `{"key": "value", ...}`. Every call re-reads it, and
/// every write replaces it through a uniquely named temp file + rename, so
/// a concurrent reader never sees a half-written file and two writers never
/// share a temp file.
///
/// Writes are not locked: when two handles (or two processes) write at
/// the same time, each replaces the whole file and the last writer wins.
/// An update from the other writer may be lost.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Opens (or prepares to create) the storage file at `path`.
    ///
    /// Missing parent directories are created. The file itself is only
    /// created on the first write.
    ///
    /// # Errors
    /// [`StoreError::Io`] if the parent directory can't be created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        tracing::debug!(path = %path.display(), "file storage opened");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(StoreError::Corrupt)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn persist(
        &self,
        items: &BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        let bytes =
            serde_json::to_vec_pretty(items).map_err(StoreError::Corrupt)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.load()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut items = self.load()?;
        items.insert(key.to_string(), value.to_string());
        self.persist(&items)
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        let mut items = self.load()?;
        if items.remove(key).is_some() {
            self.persist(&items)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.load()?.into_keys().collect())
    }
}
