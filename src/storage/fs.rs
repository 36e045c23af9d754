// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Filesystem-backed persistence for records and ciphertext blobs.
//!
//! Every write goes to a uniquely named temporary file that is then renamed
//! (or hard-linked, for create-only writes) into place, so readers never see
//! a partially written record or blob.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use super::StoragePaths;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Storage not initialized")]
    NotInitialized,
    /// Stored bytes no longer match their recorded digest.
    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(e.to_string()),
            io::ErrorKind::AlreadyExists => StorageError::AlreadyExists(e.to_string()),
            _ => StorageError::Io(e),
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage manager rooted at a data directory.
#[derive(Debug, Clone)]
pub struct FsStorage {
    paths: StoragePaths,
    initialized: bool,
}

impl FsStorage {
    /// Create a new FsStorage instance.
    ///
    /// Does NOT initialize the directory structure. Call `initialize()` first.
    pub fn new(paths: StoragePaths) -> Self {
        Self {
            paths,
            initialized: false,
        }
    }

    /// Get the storage paths.
    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    /// Initialize the directory structure.
    ///
    /// Safe to call multiple times (idempotent).
    pub fn initialize(&mut self) -> StorageResult<()> {
        let dirs = [
            self.paths.files_dir(),
            self.paths.blobs_dir(),
            self.paths.sessions_dir(),
            self.paths.vendor_requests_dir(),
            self.paths.verified_vendors_dir(),
            self.paths.accounts_dir(),
            self.paths.audit_dir(),
        ];

        for dir in dirs {
            fs::create_dir_all(&dir)?;
        }

        self.initialized = true;
        Ok(())
    }

    /// Write-read-delete probe of the data directory.
    pub fn health_check(&self) -> StorageResult<()> {
        self.ensure_initialized()?;

        let test_file = self.paths.root().join(".health_check");
        let test_data = b"health_check_data";

        fs::write(&test_file, test_data)?;
        let read_data = fs::read(&test_file)?;
        fs::remove_file(&test_file)?;

        if read_data != test_data {
            return Err(StorageError::IntegrityViolation(
                "Health check data mismatch".to_string(),
            ));
        }

        Ok(())
    }

    // ========== Generic JSON Operations ==========

    /// Read a JSON file and deserialize it.
    pub fn read_json<T: DeserializeOwned>(&self, path: impl AsRef<Path>) -> StorageResult<T> {
        self.ensure_initialized()?;

        let file = File::open(path.as_ref())?;
        let reader = BufReader::new(file);
        let value = serde_json::from_reader(reader)?;
        Ok(value)
    }

    /// Write a JSON file, replacing any previous content atomically.
    pub fn write_json<T: Serialize>(&self, path: impl AsRef<Path>, value: &T) -> StorageResult<()> {
        self.ensure_initialized()?;

        let path = path.as_ref();
        let temp_path = self.stage_json(path, value)?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Write a JSON file only if nothing exists at `path` yet.
    ///
    /// Returns `AlreadyExists` when another writer got there first; the
    /// check and the write are a single filesystem operation.
    pub fn create_json<T: Serialize>(
        &self,
        path: impl AsRef<Path>,
        value: &T,
    ) -> StorageResult<()> {
        self.ensure_initialized()?;

        let path = path.as_ref();
        let temp_path = self.stage_json(path, value)?;
        let linked = fs::hard_link(&temp_path, path);
        let _ = fs::remove_file(&temp_path);

        match linked {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(
                StorageError::AlreadyExists(path.display().to_string()),
            ),
            Err(e) => Err(e.into()),
        }
    }

    /// Check if a file exists.
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        path.as_ref().is_file()
    }

    /// Delete a file.
    pub fn delete(&self, path: impl AsRef<Path>) -> StorageResult<()> {
        self.ensure_initialized()?;
        fs::remove_file(path.as_ref())?;
        Ok(())
    }

    /// List the stems of all files in `dir` with the given extension.
    pub fn list_files(&self, dir: impl AsRef<Path>, extension: &str) -> StorageResult<Vec<String>> {
        self.ensure_initialized()?;

        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != extension) {
                continue;
            }
            if let Some(id) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(id.to_string());
            }
        }
        Ok(ids)
    }

    /// List all subdirectories in a directory.
    pub fn list_dirs(&self, dir: impl AsRef<Path>) -> StorageResult<Vec<String>> {
        self.ensure_initialized()?;

        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }

    // ========== Raw File Operations ==========

    /// Write raw bytes atomically (all-or-nothing).
    pub fn write_raw(&self, path: impl AsRef<Path>, data: &[u8]) -> StorageResult<()> {
        self.ensure_initialized()?;

        let path = path.as_ref();
        let temp_path = temp_path_for(path)?;
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(data)?;
            file.sync_all()?;
        }

        if let Err(e) = fs::rename(&temp_path, path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        Ok(())
    }

    /// Read raw bytes from a file.
    pub fn read_raw(&self, path: impl AsRef<Path>) -> StorageResult<Vec<u8>> {
        self.ensure_initialized()?;

        let mut file = File::open(path.as_ref())?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Append one line to a file, creating it (and its parents) if needed.
    pub fn append_line(&self, path: impl AsRef<Path>, line: &str) -> StorageResult<()> {
        self.ensure_initialized()?;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut record = String::with_capacity(line.len() + 1);
        record.push_str(line);
        record.push('\n');

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(record.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    fn ensure_initialized(&self) -> StorageResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(StorageError::NotInitialized)
        }
    }

    fn stage_json<T: Serialize>(&self, path: &Path, value: &T) -> StorageResult<PathBuf> {
        let temp_path = temp_path_for(path)?;
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        let written = serde_json::to_writer_pretty(&mut writer, value)
            .map_err(StorageError::from)
            .and_then(|_| writer.flush().map_err(StorageError::from));

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
        Ok(temp_path)
    }
}

/// Unique sibling path used to stage a write to `path`.
fn temp_path_for(path: &Path) -> StorageResult<PathBuf> {
    let parent = path.parent().ok_or_else(|| {
        StorageError::SerializationError(format!("No parent directory for {}", path.display()))
    })?;
    fs::create_dir_all(parent)?;

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("record");
    Ok(parent.join(format!(".{name}.{}.tmp", uuid::Uuid::new_v4())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    fn test_storage() -> (TempDir, FsStorage) {
        let temp = TempDir::new().unwrap();
        let mut storage = FsStorage::new(StoragePaths::new(temp.path()));
        storage.initialize().expect("Failed to initialize test storage");
        (temp, storage)
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct TestData {
        id: String,
        value: i32,
    }

    #[test]
    fn initialize_creates_directories() {
        let (_temp, storage) = test_storage();

        assert!(storage.paths().files_dir().exists());
        assert!(storage.paths().blobs_dir().exists());
        assert!(storage.paths().sessions_dir().exists());
        assert!(storage.paths().vendor_requests_dir().exists());
        assert!(storage.paths().verified_vendors_dir().exists());
        assert!(storage.paths().audit_dir().exists());
    }

    #[test]
    fn write_and_read_json() {
        let (_temp, storage) = test_storage();
        let data = TestData {
            id: "test-1".to_string(),
            value: 42,
        };

        let path = storage.paths().file_meta("test");
        storage.write_json(&path, &data).unwrap();

        let read: TestData = storage.read_json(&path).unwrap();
        assert_eq!(read, data);
    }

    #[test]
    fn create_json_refuses_to_overwrite() {
        let (_temp, storage) = test_storage();
        let path = storage.paths().session("s-1");

        storage
            .create_json(&path, &TestData { id: "first".into(), value: 1 })
            .unwrap();
        let second = storage.create_json(&path, &TestData { id: "second".into(), value: 2 });
        assert!(matches!(second, Err(StorageError::AlreadyExists(_))));

        let read: TestData = storage.read_json(&path).unwrap();
        assert_eq!(read.id, "first");

        // No staging files are left behind.
        let leftovers = storage.list_files(storage.paths().sessions_dir(), "tmp").unwrap();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn write_and_read_raw() {
        let (_temp, storage) = test_storage();
        let data = b"raw bytes: \x00\x01\x02\xff";

        let path = storage.paths().blob("abc.bin");
        storage.write_raw(&path, data).unwrap();

        assert_eq!(storage.read_raw(&path).unwrap(), data);
    }

    #[test]
    fn append_line_accumulates() {
        let (_temp, storage) = test_storage();
        let path = storage.paths().audit_events_file("access", "2026-01-01");

        storage.append_line(&path, "one").unwrap();
        storage.append_line(&path, "two").unwrap();

        let content = String::from_utf8(storage.read_raw(&path).unwrap()).unwrap();
        assert_eq!(content, "one\ntwo\n");
    }

    #[test]
    fn health_check_works() {
        let (_temp, storage) = test_storage();
        storage.health_check().expect("Health check should pass");
    }

    #[test]
    fn list_files_returns_ids() {
        let (_temp, storage) = test_storage();

        for i in 1..=3 {
            storage
                .write_json(storage.paths().file_meta(&format!("f-{i}")), &TestData {
                    id: format!("f-{i}"),
                    value: i,
                })
                .unwrap();
        }

        let ids = storage.list_files(storage.paths().files_dir(), "json").unwrap();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&"f-1".to_string()));
        assert!(ids.contains(&"f-3".to_string()));
    }

    #[test]
    fn missing_file_maps_to_not_found() {
        let (_temp, storage) = test_storage();
        let result = storage.read_json::<TestData>(storage.paths().file_meta("nope"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn uninitialized_storage_returns_error() {
        let storage = FsStorage::new(StoragePaths::new("/tmp/never-init"));

        let result = storage.read_json::<TestData>("/tmp/any.json");
        assert!(matches!(result, Err(StorageError::NotInitialized)));
    }
}
