//! Durable key/value surfaces the response cache persists to.
//!
//! The cache only needs three synchronous, fallible calls. Adapters:
//! [`MemoryStorage`] for tests and embedding, [`FileStorage`] for the CLI.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing::debug;

use crate::error::{Result, TapError};

/// A string-keyed persistence surface.
pub trait CacheStorage: Send + Sync {
    /// Adapter name for log output.
    fn name(&self) -> &str;

    /// Read an item. `Ok(None)` when the key has never been written.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Write an item, replacing any previous value.
    ///
    /// Adapters report capacity failures as [`TapError::QuotaExceeded`].
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove an item. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// In-process storage backed by a `HashMap`.
///
/// Supports an optional per-item byte quota and fault injection so callers
/// can exercise the cache's degraded paths.
#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
    max_item_bytes: Option<usize>,
    fail_reads: AtomicBool,
    fail_removes: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes whose value exceeds `bytes` with `QuotaExceeded`.
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.max_item_bytes = Some(bytes);
        self
    }

    /// Make every subsequent `get_item` fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Relaxed);
    }

    /// Make every subsequent `remove_item` fail.
    pub fn set_fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::Relaxed);
    }

    /// Whether `key` currently holds a value.
    pub fn contains(&self, key: &str) -> bool {
        self.lock().map(|items| items.contains_key(key)).unwrap_or(false)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.items
            .lock()
            .map_err(|_| TapError::Storage("memory storage lock poisoned".into()))
    }
}

impl CacheStorage for MemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    fn get_item(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads.load(Ordering::Relaxed) {
            return Err(TapError::Storage(format!("read of '{}' failed", key)));
        }
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        if let Some(max) = self.max_item_bytes {
            if value.len() > max {
                return Err(TapError::QuotaExceeded(format!(
                    "'{}' is {} bytes, quota is {}",
                    key,
                    value.len(),
                    max
                )));
            }
        }
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        if self.fail_removes.load(Ordering::Relaxed) {
            return Err(TapError::Storage(format!("remove of '{}' failed", key)));
        }
        self.lock()?.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileStorage
// ---------------------------------------------------------------------------

/// One JSON file per key inside a directory.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves the previous value intact.
pub struct FileStorage {
    dir: PathBuf,
    max_item_bytes: Option<usize>,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_item_bytes: None,
        }
    }

    /// Reject writes whose value exceeds `bytes` with `QuotaExceeded`.
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.max_item_bytes = Some(bytes);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`.
    pub fn item_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(TapError::Storage(format!("invalid storage key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl CacheStorage for FileStorage {
    fn name(&self) -> &str {
        "file"
    }

    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.item_path(key)?;
        match std::fs::read_to_string(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TapError::Storage(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        if let Some(max) = self.max_item_bytes {
            if value.len() > max {
                return Err(TapError::QuotaExceeded(format!(
                    "'{}' is {} bytes, quota is {}",
                    key,
                    value.len(),
                    max
                )));
            }
        }
        let path = self.item_path(key)?;
        std::fs::create_dir_all(&self.dir)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), bytes = value.len(), "Wrote storage item");
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let path = self.item_path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TapError::Storage(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}
