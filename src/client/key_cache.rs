// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Local store of file keys, keyed by file id.
//!
//! The uploader keeps every key it generates so it can reopen its own
//! shares; a vendor may keep keys received out of band. Keys never leave
//! this store except inside a share link fragment.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::crypto::FileKey;

#[derive(Debug, thiserror::Error)]
pub enum KeyCacheError {
    #[error("Key cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Key cache is corrupted: {0}")]
    Corrupted(String),
}

/// Keyed store for file keys.
pub trait KeyCache: Send + Sync {
    fn get(&self, file_id: &str) -> Option<FileKey>;
    fn set(&self, file_id: &str, key: &FileKey) -> Result<(), KeyCacheError>;
}

/// Process-local cache; forgotten on exit.
#[derive(Debug, Default)]
pub struct MemoryKeyCache {
    keys: Mutex<HashMap<String, FileKey>>,
}

impl MemoryKeyCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyCache for MemoryKeyCache {
    fn get(&self, file_id: &str) -> Option<FileKey> {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(file_id)
            .cloned()
    }

    fn set(&self, file_id: &str, key: &FileKey) -> Result<(), KeyCacheError> {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(file_id.to_string(), key.clone());
        Ok(())
    }
}

/// Cache persisted as a JSON object `{file_id: base64 key}`.
///
/// Writes go to a temporary file that is renamed over the cache, so a
/// crash never leaves a half-written map behind.
#[derive(Debug)]
pub struct FileKeyCache {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileKeyCache {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<HashMap<String, String>, KeyCacheError> {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| KeyCacheError::Corrupted(format!("{}: {e}", self.path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, keys: &HashMap<String, String>) -> Result<(), KeyCacheError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(keys)
            .map_err(|e| KeyCacheError::Corrupted(e.to_string()))?;
        let temp = self.path.with_extension("tmp");
        fs::write(&temp, json)?;
        fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

impl KeyCache for FileKeyCache {
    fn get(&self, file_id: &str) -> Option<FileKey> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let keys = match self.load() {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read key cache");
                return None;
            }
        };
        keys.get(file_id).and_then(|k| FileKey::from_base64(k).ok())
    }

    fn set(&self, file_id: &str, key: &FileKey) -> Result<(), KeyCacheError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut keys = self.load()?;
        keys.insert(file_id.to_string(), key.to_base64());
        self.store(&keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key(byte: u8) -> FileKey {
        FileKey::from_bytes(&[byte; 32]).unwrap()
    }

    #[test]
    fn memory_cache_returns_what_was_set() {
        let cache = MemoryKeyCache::new();
        assert!(cache.get("f-1").is_none());
        cache.set("f-1", &key(1)).unwrap();
        assert_eq!(cache.get("f-1"), Some(key(1)));
    }

    #[test]
    fn file_cache_survives_reopening() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("keys").join("cache.json");

        let cache = FileKeyCache::new(&path);
        cache.set("f-1", &key(1)).unwrap();
        cache.set("f-2", &key(2)).unwrap();

        let reopened = FileKeyCache::new(&path);
        assert_eq!(reopened.get("f-1"), Some(key(1)));
        assert_eq!(reopened.get("f-2"), Some(key(2)));
        assert!(reopened.get("f-3").is_none());
    }

    #[test]
    fn corrupted_file_cache_reads_as_empty_but_refuses_writes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        fs::write(&path, b"not json").unwrap();

        let cache = FileKeyCache::new(&path);
        assert!(cache.get("f-1").is_none());
        assert!(matches!(cache.set("f-1", &key(1)), Err(KeyCacheError::Corrupted(_))));
    }
}
