// src/pipeline/cache.rs

//! Content-addressed cache for optimized images.
//!
//! Keys are blake3 hashes of the *input* bytes; values are the bytes the
//! optimizer produced for that input. Unchanged images are therefore never
//! re-encoded, across runs when the file store is used.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tracing::{debug, info};

use crate::fs::FileSystem;
use crate::types::CacheStorageMode;

/// Cache key for a blob of input bytes.
pub fn content_key(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Abstract storage for cached optimization results.
pub trait CacheStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn save(&self, key: &str, bytes: &[u8]) -> Result<()>;
    /// Drop every entry. Returns how many were removed.
    fn clear(&self) -> Result<usize>;
}

/// Stores one file per entry under the project cache directory.
#[derive(Debug)]
pub struct FileCacheStore {
    dir: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FileCacheStore {
    pub fn new(dir: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            dir: dir.into(),
            fs,
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl CacheStore for FileCacheStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(key);
        if !self.fs.is_file(&path) {
            return Ok(None);
        }
        Ok(Some(self.fs.read(&path)?))
    }

    fn save(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.fs.write(&self.entry_path(key), bytes)?;
        debug!(key = %key, len = bytes.len(), "stored cache entry (file)");
        Ok(())
    }

    fn clear(&self) -> Result<usize> {
        if !self.fs.is_dir(&self.dir) {
            return Ok(0);
        }
        let removed = self.fs.read_dir(&self.dir)?.len();
        self.fs.remove_all(&self.dir)?;
        info!(removed, dir = ?self.dir, "cleared image cache");
        Ok(removed)
    }
}

/// Keeps entries in memory only; lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    map: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.map.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl CacheStore for MemoryCacheStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lock().get(key).cloned())
    }

    fn save(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.lock().insert(key.to_string(), bytes.to_vec());
        debug!(key = %key, len = bytes.len(), "stored cache entry (memory)");
        Ok(())
    }

    fn clear(&self) -> Result<usize> {
        let mut map = self.lock();
        let removed = map.len();
        map.clear();
        info!(removed, "cleared image cache (memory)");
        Ok(removed)
    }
}

/// Open the cache selected by `[project].cache`.
pub fn open_cache(
    mode: CacheStorageMode,
    dir: impl Into<PathBuf>,
    fs: Arc<dyn FileSystem>,
) -> Arc<dyn CacheStore> {
    match mode {
        CacheStorageMode::File => Arc::new(FileCacheStore::new(dir, fs)),
        CacheStorageMode::Memory => Arc::new(MemoryCacheStore::new()),
    }
}
