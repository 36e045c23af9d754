// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Vendor session repository.
//!
//! Each session is stored as a separate JSON file under `/data/sessions/`.
//! Sessions are never deleted: revocation flips `is_active`, expiry is a
//! read-time check.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{FsStorage, StorageError, StorageResult};

/// Session stored on the filesystem.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StoredSession {
    /// Unique session identifier (UUID)
    pub session_id: String,
    /// End user the vendor acts for
    pub user_id: String,
    /// Verified vendor holding the session
    pub vendor_id: String,
    /// Signed credential proving issuance
    pub session_token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl StoredSession {
    /// Active and not yet expired at `now`.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at > now
    }
}

/// Repository for vendor sessions.
pub struct SessionRepository<'a> {
    storage: &'a FsStorage,
}

impl<'a> SessionRepository<'a> {
    pub fn new(storage: &'a FsStorage) -> Self {
        Self { storage }
    }

    pub fn get(&self, session_id: &str) -> StorageResult<StoredSession> {
        if uuid::Uuid::parse_str(session_id).is_err() {
            return Err(StorageError::NotFound(format!("Session {session_id}")));
        }
        let path = self.storage.paths().session(session_id);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Session {session_id}")));
        }
        self.storage.read_json(path)
    }

    /// Persist a new session. Fails with `AlreadyExists` on an id collision.
    pub fn create(&self, session: &StoredSession) -> StorageResult<()> {
        self.storage
            .create_json(self.storage.paths().session(&session.session_id), session)
    }

    pub fn update(&self, session: &StoredSession) -> StorageResult<()> {
        let path = self.storage.paths().session(&session.session_id);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!(
                "Session {}",
                session.session_id
            )));
        }
        self.storage.write_json(path, session)
    }

    /// The most recently created usable session for a (user, vendor) pair.
    pub fn find_usable(
        &self,
        user_id: &str,
        vendor_id: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<StoredSession>> {
        Ok(self
            .list_all()?
            .into_iter()
            .find(|s| s.user_id == user_id && s.vendor_id == vendor_id && s.is_usable_at(now)))
    }

    /// All sessions, newest first.
    pub fn list_all(&self) -> StorageResult<Vec<StoredSession>> {
        let ids = self
            .storage
            .list_files(self.storage.paths().sessions_dir(), "json")?;

        let mut sessions: Vec<StoredSession> =
            ids.iter().filter_map(|id| self.get(id).ok()).collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    /// Sessions usable at `now`, newest first.
    pub fn list_usable(&self, now: DateTime<Utc>) -> StorageResult<Vec<StoredSession>> {
        let mut sessions = self.list_all()?;
        sessions.retain(|s| s.is_usable_at(now));
        Ok(sessions)
    }
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

    fn session(user: &str, vendor: &str, expires_in: Duration) -> StoredSession {
        let now = Utc::now();
        StoredSession {
            session_id: uuid::Uuid::new_v4().to_string(),
            user_id: user.to_string(),
            vendor_id: vendor.to_string(),
            session_token: "token".to_string(),
            created_at: now,
            expires_at: now + expires_in,
            is_active: true,
            revoked_by: None,
            revoked_at: None,
        }
    }

    #[test]
    fn create_get_update() {
        let (_temp, storage) = setup();
        let repo = SessionRepository::new(&storage);

        let mut s = session("42", "7", Duration::hours(24));
        repo.create(&s).unwrap();
        assert!(matches!(repo.create(&s), Err(StorageError::AlreadyExists(_))));
        assert_eq!(repo.get(&s.session_id).unwrap(), s);

        s.is_active = false;
        s.revoked_by = Some("auditor".to_string());
        repo.update(&s).unwrap();
        assert!(!repo.get(&s.session_id).unwrap().is_active);
    }

    #[test]
    fn find_usable_skips_inactive_and_expired() {
        let (_temp, storage) = setup();
        let repo = SessionRepository::new(&storage);
        let now = Utc::now();

        let mut revoked = session("42", "7", Duration::hours(24));
        revoked.is_active = false;
        repo.create(&revoked).unwrap();
        repo.create(&session("42", "7", Duration::seconds(-1))).unwrap();
        repo.create(&session("42", "8", Duration::hours(24))).unwrap();

        assert!(repo.find_usable("42", "7", now).unwrap().is_none());

        let live = session("42", "7", Duration::hours(24));
        repo.create(&live).unwrap();
        assert_eq!(
            repo.find_usable("42", "7", now).unwrap().map(|s| s.session_id),
            Some(live.session_id)
        );
        assert_eq!(repo.list_usable(now).unwrap().len(), 2);
        assert_eq!(repo.list_all().unwrap().len(), 4);
    }

    #[test]
    fn malformed_session_id_is_not_found() {
        let (_temp, storage) = setup();
        let repo = SessionRepository::new(&storage);
        assert!(matches!(repo.get("../files/x"), Err(StorageError::NotFound(_))));
    }
}
