// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared file repository.
//!
//! ## Storage Layout
//!
//! ```text
//! /data/files/{file_id}.json   # FileRecord metadata
//! /data/blobs/{file_id}.bin    # Ciphertext || tag, opaque to the server
//! ```
//!
//! The blob is written before the metadata record, and the record is
//! created exclusively, so `get`/`download` never see a record whose
//! ciphertext is missing or partially written.
//!
//! The decryption key is never stored here. Only the IV is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use crate::identity::same_email;

use super::super::{FsStorage, StorageError, StorageResult};

/// Denial reasons for reading a shared file.
#[derive(Debug, thiserror::Error)]
pub enum FileAccessError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("File {0} has been revoked")]
    Revoked(String),
    #[error("File {0} has expired")]
    Expired(String),
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for FileAccessError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(what) => FileAccessError::NotFound(what),
            other => FileAccessError::Storage(other),
        }
    }
}

/// Metadata of one shared file.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct FileRecord {
    /// Unique file identifier (UUID)
    pub file_id: String,
    /// Name shown to users
    pub original_filename: String,
    /// Name of the ciphertext blob in storage
    pub encrypted_filename: String,
    pub sender_email: String,
    pub recipient_email: String,
    /// Opaque handle to the stored ciphertext
    pub ciphertext_ref: String,
    /// Base64 initialization vector used at encryption time
    pub iv: String,
    pub mime_type: String,
    /// Ciphertext size in bytes (including the tag)
    pub size: u64,
    /// Plaintext size as reported by the uploader
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_size: Option<u64>,
    /// Hex SHA-256 of the stored ciphertext
    pub ciphertext_sha256: String,
    pub created_at: DateTime<Utc>,
    /// Downloads are rejected from this instant on
    pub expiry_time: DateTime<Utc>,
    /// Monotonic: once true, never false again
    pub revoked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_by: Option<String>,
}

impl FileRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry_time
    }

    /// Read-time access predicate. Revocation takes precedence over expiry.
    pub fn check_access(&self, now: DateTime<Utc>) -> Result<(), FileAccessError> {
        if self.revoked {
            return Err(FileAccessError::Revoked(self.file_id.clone()));
        }
        if self.is_expired_at(now) {
            return Err(FileAccessError::Expired(self.file_id.clone()));
        }
        Ok(())
    }
}

/// Uploader-supplied metadata for a new file.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub original_filename: String,
    pub sender_email: String,
    pub recipient_email: String,
    pub iv: String,
    pub mime_type: String,
    pub original_size: Option<u64>,
    pub expiry_time: DateTime<Utc>,
}

/// Result of a revocation request.
#[derive(Debug, Clone)]
pub struct Revocation {
    pub record: FileRecord,
    /// The file had already been revoked before this request.
    pub already_revoked: bool,
}

/// Repository for shared files.
pub struct FileRepository<'a> {
    storage: &'a FsStorage,
}

impl<'a> FileRepository<'a> {
    pub fn new(storage: &'a FsStorage) -> Self {
        Self { storage }
    }

    /// Store ciphertext and metadata under a freshly generated id.
    ///
    /// The ciphertext is stored verbatim; its content is never inspected.
    pub fn put(&self, ciphertext: &[u8], file: NewFile) -> StorageResult<FileRecord> {
        let file_id = uuid::Uuid::new_v4().to_string();
        let encrypted_filename = format!("{file_id}.bin");

        let record = FileRecord {
            file_id: file_id.clone(),
            original_filename: file.original_filename,
            encrypted_filename: encrypted_filename.clone(),
            sender_email: file.sender_email,
            recipient_email: file.recipient_email,
            ciphertext_ref: encrypted_filename.clone(),
            iv: file.iv,
            mime_type: file.mime_type,
            size: ciphertext.len() as u64,
            original_size: file.original_size,
            ciphertext_sha256: sha256_hex(ciphertext),
            created_at: Utc::now(),
            expiry_time: file.expiry_time,
            revoked: false,
            revoked_at: None,
            revoked_by: None,
        };

        let blob_path = self.storage.paths().blob(&encrypted_filename);
        self.storage.write_raw(&blob_path, ciphertext)?;

        if let Err(e) = self
            .storage
            .create_json(self.storage.paths().file_meta(&file_id), &record)
        {
            let _ = self.storage.delete(&blob_path);
            return Err(e);
        }

        Ok(record)
    }

    /// Metadata only. No access predicate is applied.
    pub fn get_meta(&self, file_id: &str) -> StorageResult<FileRecord> {
        let file_id = checked_id(file_id)?;
        let path = self.storage.paths().file_meta(file_id);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("File {file_id}")));
        }
        self.storage.read_json(path)
    }

    /// Ciphertext and metadata. No access predicate is applied.
    pub fn get(&self, file_id: &str) -> StorageResult<(Vec<u8>, FileRecord)> {
        let record = self.get_meta(file_id)?;
        let ciphertext = self.read_ciphertext(&record)?;
        Ok((ciphertext, record))
    }

    /// Ciphertext of a file that is neither revoked nor expired at `now`.
    ///
    /// The metadata is re-read on every call, so a revocation is visible
    /// to the very next download.
    pub fn download(
        &self,
        file_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(Vec<u8>, FileRecord), FileAccessError> {
        let record = self.get_meta(file_id)?;
        record.check_access(now)?;
        let ciphertext = self.read_ciphertext(&record)?;
        Ok((ciphertext, record))
    }

    /// Revoke a file. Revoking an already revoked file succeeds and leaves
    /// the original revocation details untouched.
    pub fn revoke(&self, file_id: &str, revoked_by: Option<&str>) -> StorageResult<Revocation> {
        let mut record = self.get_meta(file_id)?;
        if record.revoked {
            return Ok(Revocation {
                record,
                already_revoked: true,
            });
        }

        record.revoked = true;
        record.revoked_at = Some(Utc::now());
        record.revoked_by = revoked_by.map(str::to_string);
        self.storage
            .write_json(self.storage.paths().file_meta(&record.file_id), &record)?;

        Ok(Revocation {
            record,
            already_revoked: false,
        })
    }

    /// Files sent by `email`, newest first.
    pub fn list_by_sender(&self, email: &str) -> StorageResult<Vec<FileRecord>> {
        self.list_matching(|r| same_email(&r.sender_email, email))
    }

    /// Files addressed to `email`, newest first.
    pub fn list_by_recipient(&self, email: &str) -> StorageResult<Vec<FileRecord>> {
        self.list_matching(|r| same_email(&r.recipient_email, email))
    }

    /// Every file, newest first.
    pub fn list_all(&self) -> StorageResult<Vec<FileRecord>> {
        self.list_matching(|_| true)
    }

    fn list_matching(&self, keep: impl Fn(&FileRecord) -> bool) -> StorageResult<Vec<FileRecord>> {
        let ids = self
            .storage
            .list_files(self.storage.paths().files_dir(), "json")?;

        let mut records: Vec<FileRecord> = ids
            .iter()
            .filter_map(|id| self.get_meta(id).ok())
            .filter(|r| keep(r))
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    fn read_ciphertext(&self, record: &FileRecord) -> StorageResult<Vec<u8>> {
        let ciphertext = self
            .storage
            .read_raw(self.storage.paths().blob(&record.ciphertext_ref))?;
        if sha256_hex(&ciphertext) != record.ciphertext_sha256 {
            return Err(StorageError::IntegrityViolation(format!(
                "Ciphertext of file {} does not match its digest",
                record.file_id
            )));
        }
        Ok(ciphertext)
    }
}

/// Only UUIDs name files; anything else cannot exist.
fn checked_id(file_id: &str) -> StorageResult<&str> {
    match uuid::Uuid::parse_str(file_id) {
        Ok(_) => Ok(file_id),
        Err(_) => Err(StorageError::NotFound(format!("File {file_id}"))),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoragePaths;
    use chrono::Duration;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FsStorage) {
        let temp = TempDir::new().unwrap();
        let mut storage = FsStorage::new(StoragePaths::new(temp.path()));
        storage.initialize().unwrap();
        (temp, storage)
    }

    fn new_file(sender: &str, recipient: &str, expires_in: Duration) -> NewFile {
        NewFile {
            original_filename: "report.pdf".to_string(),
            sender_email: sender.to_string(),
            recipient_email: recipient.to_string(),
            iv: "AAAAAAAAAAAAAAAA".to_string(),
            mime_type: "application/pdf".to_string(),
            original_size: Some(10),
            expiry_time: Utc::now() + expires_in,
        }
    }

    #[test]
    fn put_then_get_returns_ciphertext_verbatim() {
        let (_temp, storage) = setup();
        let repo = FileRepository::new(&storage);

        let record = repo
            .put(b"opaque-bytes", new_file("a@bank.com", "v@vendor.com", Duration::hours(1)))
            .unwrap();
        assert_eq!(record.encrypted_filename, format!("{}.bin", record.file_id));
        assert_eq!(record.size, 12);
        assert!(!record.revoked);

        let (ciphertext, meta) = repo.get(&record.file_id).unwrap();
        assert_eq!(ciphertext, b"opaque-bytes");
        assert_eq!(meta, record);
    }

    #[test]
    fn unknown_or_malformed_ids_are_not_found() {
        let (_temp, storage) = setup();
        let repo = FileRepository::new(&storage);

        let missing = uuid::Uuid::new_v4().to_string();
        assert!(matches!(repo.get(&missing), Err(StorageError::NotFound(_))));
        assert!(matches!(
            repo.get("../sessions/x"),
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            repo.download(&missing, Utc::now()),
            Err(FileAccessError::NotFound(_))
        ));
    }

    #[test]
    fn revoke_is_idempotent_and_blocks_download() {
        let (_temp, storage) = setup();
        let repo = FileRepository::new(&storage);
        let record = repo
            .put(b"helloworld", new_file("a@bank.com", "v@vendor.com", Duration::hours(1)))
            .unwrap();

        assert!(repo.download(&record.file_id, Utc::now()).is_ok());

        let first = repo.revoke(&record.file_id, Some("a@bank.com")).unwrap();
        assert!(!first.already_revoked);
        let second = repo.revoke(&record.file_id, Some("someone@else.com")).unwrap();
        assert!(second.already_revoked);
        assert!(second.record.revoked);
        assert_eq!(second.record.revoked_by.as_deref(), Some("a@bank.com"));

        assert!(matches!(
            repo.download(&record.file_id, Utc::now()),
            Err(FileAccessError::Revoked(_))
        ));
    }

    #[test]
    fn expiry_is_evaluated_at_read_time() {
        let (_temp, storage) = setup();
        let repo = FileRepository::new(&storage);
        let record = repo
            .put(b"data", new_file("a@bank.com", "v@vendor.com", Duration::minutes(5)))
            .unwrap();

        assert!(repo.download(&record.file_id, Utc::now()).is_ok());
        assert!(matches!(
            repo.download(&record.file_id, record.expiry_time),
            Err(FileAccessError::Expired(_))
        ));

        // Metadata stays readable for listings.
        assert!(repo.get_meta(&record.file_id).is_ok());
    }

    #[test]
    fn revoked_wins_over_unexpired() {
        let (_temp, storage) = setup();
        let repo = FileRepository::new(&storage);
        let record = repo
            .put(b"data", new_file("a@bank.com", "v@vendor.com", Duration::days(30)))
            .unwrap();
        repo.revoke(&record.file_id, None).unwrap();

        let past_expiry = record.expiry_time + Duration::seconds(1);
        assert!(matches!(
            repo.download(&record.file_id, past_expiry),
            Err(FileAccessError::Revoked(_))
        ));
    }

    #[test]
    fn tampered_blob_is_an_integrity_violation() {
        let (_temp, storage) = setup();
        let repo = FileRepository::new(&storage);
        let record = repo
            .put(b"data", new_file("a@bank.com", "v@vendor.com", Duration::hours(1)))
            .unwrap();

        storage
            .write_raw(storage.paths().blob(&record.ciphertext_ref), b"DATA")
            .unwrap();
        assert!(matches!(
            repo.download(&record.file_id, Utc::now()),
            Err(FileAccessError::Storage(StorageError::IntegrityViolation(_)))
        ));
    }

    #[test]
    fn listings_match_identity_case_insensitively() {
        let (_temp, storage) = setup();
        let repo = FileRepository::new(&storage);

        let first = repo
            .put(b"1", new_file("a@bank.com", "v@vendor.com", Duration::hours(1)))
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = repo
            .put(b"2", new_file("A@Bank.com", "w@vendor.com", Duration::hours(1)))
            .unwrap();

        let sent = repo.list_by_sender("a@BANK.com").unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].file_id, second.file_id);
        assert_eq!(sent[1].file_id, first.file_id);

        let received = repo.list_by_recipient("V@vendor.com").unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].file_id, first.file_id);

        assert!(repo.list_by_recipient("nobody@vendor.com").unwrap().is_empty());
        assert_eq!(repo.list_all().unwrap().len(), 2);
    }
}
