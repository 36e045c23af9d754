// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path constants and utilities for the storage layout.

use std::path::{Path, PathBuf};

/// Default base directory for persistent storage.
pub const DATA_ROOT: &str = "./data";

/// Audit stream holding vendor facility invocations.
pub const ACCESS_LOG_STREAM: &str = "access";

/// Audit stream holding file upload/download/revoke events.
pub const FILE_AUDIT_STREAM: &str = "files";

/// Storage path utilities.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========== Shared File Paths ==========

    /// Directory containing file metadata records.
    pub fn files_dir(&self) -> PathBuf {
        self.root.join("files")
    }

    /// Path to a file's metadata record.
    pub fn file_meta(&self, file_id: &str) -> PathBuf {
        self.files_dir().join(format!("{file_id}.json"))
    }

    /// Directory containing opaque ciphertext blobs.
    pub fn blobs_dir(&self) -> PathBuf {
        self.root.join("blobs")
    }

    /// Path to a stored ciphertext blob.
    pub fn blob(&self, encrypted_filename: &str) -> PathBuf {
        self.blobs_dir().join(encrypted_filename)
    }

    // ========== Vendor Session Paths ==========

    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }

    pub fn session(&self, session_id: &str) -> PathBuf {
        self.sessions_dir().join(format!("{session_id}.json"))
    }

    // ========== Vendor Paths ==========

    /// Pending vendor registrations, keyed by email digest.
    pub fn vendor_requests_dir(&self) -> PathBuf {
        self.root.join("vendor_requests")
    }

    pub fn vendor_request(&self, email_key: &str) -> PathBuf {
        self.vendor_requests_dir().join(format!("{email_key}.json"))
    }

    /// Verified vendors, keyed by email digest.
    pub fn verified_vendors_dir(&self) -> PathBuf {
        self.root.join("verified_vendors")
    }

    pub fn verified_vendor(&self, email_key: &str) -> PathBuf {
        self.verified_vendors_dir().join(format!("{email_key}.json"))
    }

    // ========== Bank Account Paths ==========

    pub fn accounts_dir(&self) -> PathBuf {
        self.root.join("accounts")
    }

    pub fn account(&self, email_key: &str) -> PathBuf {
        self.accounts_dir().join(format!("{email_key}.json"))
    }

    // ========== Audit Log Paths ==========

    /// Directory containing all audit streams.
    pub fn audit_dir(&self) -> PathBuf {
        self.root.join("audit")
    }

    /// Directory of one audit stream (`access` or `files`).
    pub fn audit_stream_dir(&self, stream: &str) -> PathBuf {
        self.audit_dir().join(stream)
    }

    /// Path to a daily events file (JSONL format) of one stream.
    pub fn audit_events_file(&self, stream: &str, date: &str) -> PathBuf {
        self.audit_stream_dir(stream).join(date).join("events.jsonl")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_use_data_root() {
        let paths = StoragePaths::default();
        assert_eq!(paths.root(), Path::new("./data"));
    }

    #[test]
    fn file_paths_are_correct() {
        let paths = StoragePaths::new("/srv/sharden");
        assert_eq!(paths.files_dir(), PathBuf::from("/srv/sharden/files"));
        assert_eq!(
            paths.file_meta("f-1"),
            PathBuf::from("/srv/sharden/files/f-1.json")
        );
        assert_eq!(
            paths.blob("f-1.bin"),
            PathBuf::from("/srv/sharden/blobs/f-1.bin")
        );
    }

    #[test]
    fn vendor_and_session_paths_are_correct() {
        let paths = StoragePaths::new("/srv/sharden");
        assert_eq!(
            paths.session("s-1"),
            PathBuf::from("/srv/sharden/sessions/s-1.json")
        );
        assert_eq!(
            paths.vendor_request("abc"),
            PathBuf::from("/srv/sharden/vendor_requests/abc.json")
        );
        assert_eq!(
            paths.verified_vendor("abc"),
            PathBuf::from("/srv/sharden/verified_vendors/abc.json")
        );
        assert_eq!(
            paths.account("abc"),
            PathBuf::from("/srv/sharden/accounts/abc.json")
        );
    }

    #[test]
    fn audit_paths_are_correct() {
        let paths = StoragePaths::new("/srv/sharden");
        assert_eq!(
            paths.audit_events_file(ACCESS_LOG_STREAM, "2026-01-28"),
            PathBuf::from("/srv/sharden/audit/access/2026-01-28/events.jsonl")
        );
        assert_eq!(
            paths.audit_stream_dir(FILE_AUDIT_STREAM),
            PathBuf::from("/srv/sharden/audit/files")
        );
    }
}
