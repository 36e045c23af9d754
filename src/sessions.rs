// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Vendor sessions.
//!
//! A session authorizes one verified vendor to invoke bank facilities on
//! behalf of one end user until `expires_at`. Sessions are reused while
//! usable, never renewed, and revoked explicitly.
//!
//! At most one usable session exists per (user, vendor) pair: the
//! find-or-create sequence and revocation run under a per-pair lock, so
//! concurrent first requests for a pair share one session. Unrelated pairs
//! never wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::tokens::issue_session_token;
use crate::identity::same_email;
use crate::storage::{
    AccountRepository, FsStorage, SessionRepository, StorageError, StoredSession,
    VendorRepository, VerifiedVendor,
};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Vendor token and email do not match a verified vendor.
    #[error("Invalid or unverified vendor")]
    Unauthorized,
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error("Failed to issue session token: {0}")]
    Token(String),
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for SessionError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(what) => SessionError::NotFound(what),
            other => SessionError::Storage(other),
        }
    }
}

/// Result of [`VendorSessionManager::get_or_create_session`].
#[derive(Debug, Clone)]
pub struct SessionGrant {
    pub session: StoredSession,
    /// False when an existing usable session was reused.
    pub created: bool,
}

/// A usable session joined with its user and vendor.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActiveSession {
    pub session_id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    pub vendor_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

type PairKey = (String, String);

/// Issues, reuses and revokes vendor sessions.
pub struct VendorSessionManager {
    storage: FsStorage,
    token_secret: Vec<u8>,
    ttl: Duration,
    pair_locks: Mutex<HashMap<PairKey, Arc<Mutex<()>>>>,
}

impl VendorSessionManager {
    pub fn new(storage: FsStorage, token_secret: Vec<u8>, ttl: Duration) -> Self {
        Self {
            storage,
            token_secret,
            ttl,
            pair_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Find the verified vendor holding exactly this token and email.
    ///
    /// There is no partial match: a known email with a different token is
    /// rejected just like an unknown email.
    pub fn authenticate_vendor(
        &self,
        token: &str,
        email: &str,
    ) -> Result<VerifiedVendor, SessionError> {
        let vendor = match VendorRepository::new(&self.storage).get_verified(email) {
            Ok(vendor) => vendor,
            Err(StorageError::NotFound(_)) => return Err(SessionError::Unauthorized),
            Err(e) => return Err(SessionError::Storage(e)),
        };

        if vendor.vendor_token != token || !same_email(&vendor.vendor_email, email) {
            return Err(SessionError::Unauthorized);
        }
        Ok(vendor)
    }

    /// Reuse the usable session of the pair, or create one.
    ///
    /// A reused session is returned unchanged; its expiry is not extended.
    pub fn get_or_create_session(
        &self,
        user_id: &str,
        vendor_id: &str,
    ) -> Result<SessionGrant, SessionError> {
        self.with_pair_lock(user_id, vendor_id, || {
            let repo = SessionRepository::new(&self.storage);
            let now = Utc::now();

            if let Some(session) = repo.find_usable(user_id, vendor_id, now)? {
                tracing::debug!(session_id = %session.session_id, "Reusing vendor session");
                return Ok(SessionGrant {
                    session,
                    created: false,
                });
            }

            let expires_at = now + self.ttl;
            let session_token =
                issue_session_token(&self.token_secret, user_id, vendor_id, now, expires_at)
                    .map_err(|e| SessionError::Token(e.to_string()))?;

            let session = StoredSession {
                session_id: uuid::Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                vendor_id: vendor_id.to_string(),
                session_token,
                created_at: now,
                expires_at,
                is_active: true,
                revoked_by: None,
                revoked_at: None,
            };
            repo.create(&session)?;

            tracing::info!(
                session_id = %session.session_id,
                user_id,
                vendor_id,
                expires_at = %session.expires_at,
                "Created vendor session"
            );
            Ok(SessionGrant {
                session,
                created: true,
            })
        })
    }

    /// Deactivate a session.
    ///
    /// Unlike file revocation this is not idempotent: a session that does
    /// not exist or is already inactive yields `NotFound`.
    pub fn revoke(
        &self,
        session_id: &str,
        revoked_by: &str,
    ) -> Result<StoredSession, SessionError> {
        let repo = SessionRepository::new(&self.storage);
        let session = repo.get(session_id)?;

        self.with_pair_lock(&session.user_id, &session.vendor_id, || {
            let mut session = repo.get(session_id)?;
            if !session.is_active {
                return Err(SessionError::NotFound(format!(
                    "Session {session_id} is not active"
                )));
            }

            session.is_active = false;
            session.revoked_by = Some(revoked_by.to_string());
            session.revoked_at = Some(Utc::now());
            repo.update(&session)?;

            tracing::info!(session_id, revoked_by, "Revoked vendor session");
            Ok(session)
        })
    }

    pub fn get(&self, session_id: &str) -> Result<StoredSession, SessionError> {
        Ok(SessionRepository::new(&self.storage).get(session_id)?)
    }

    /// Usable sessions at `now`, newest first, joined with user and vendor.
    pub fn list_active(&self, now: DateTime<Utc>) -> Result<Vec<ActiveSession>, SessionError> {
        let sessions = SessionRepository::new(&self.storage).list_usable(now)?;
        let accounts = AccountRepository::new(&self.storage).list_all()?;
        let vendors = VendorRepository::new(&self.storage).list_verified()?;

        Ok(sessions
            .into_iter()
            .map(|s| {
                let account = accounts.iter().find(|a| a.user_id == s.user_id);
                let vendor = vendors.iter().find(|v| v.vendor_id == s.vendor_id);
                ActiveSession {
                    user_email: account.map(|a| a.email.clone()),
                    vendor_name: vendor.map(|v| v.vendor_name.clone()),
                    vendor_email: vendor.map(|v| v.vendor_email.clone()),
                    session_id: s.session_id,
                    user_id: s.user_id,
                    vendor_id: s.vendor_id,
                    created_at: s.created_at,
                    expires_at: s.expires_at,
                }
            })
            .collect())
    }

    fn with_pair_lock<T>(
        &self,
        user_id: &str,
        vendor_id: &str,
        f: impl FnOnce() -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        let key = (user_id.to_string(), vendor_id.to_string());
        let pair_lock = Arc::clone(self.lock_map().entry(key.clone()).or_default());

        let result = {
            let _guard = pair_lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };

        // Clones are only taken and released under the map lock, so a count
        // of one means no other request holds or awaits this pair.
        let mut locks = self.lock_map();
        drop(pair_lock);
        if locks.get(&key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&key);
        }
        result
    }

    fn lock_map(&self) -> MutexGuard<'_, HashMap<PairKey, Arc<Mutex<()>>>> {
        self.pair_locks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tokens::verify_session_token;
    use crate::storage::StoragePaths;
    use tempfile::TempDir;

    const SECRET: &[u8] = b"session-secret";

    fn setup() -> (TempDir, FsStorage, VendorSessionManager) {
        let temp = TempDir::new().unwrap();
        let mut storage = FsStorage::new(StoragePaths::new(temp.path()));
        storage.initialize().unwrap();
        let manager =
            VendorSessionManager::new(storage.clone(), SECRET.to_vec(), Duration::hours(24));
        (temp, storage, manager)
    }

    fn verified_vendor(storage: &FsStorage, email: &str, token: &str) -> VerifiedVendor {
        let vendor = VerifiedVendor {
            vendor_id: "7".to_string(),
            vendor_name: "Acme".to_string(),
            vendor_email: email.to_string(),
            vendor_token: token.to_string(),
            password_hash: String::new(),
            verified_at: Utc::now(),
        };
        VendorRepository::new(storage).create_verified(&vendor).unwrap();
        vendor
    }

    #[test]
    fn authenticate_requires_exact_token_and_email() {
        let (_temp, storage, manager) = setup();
        verified_vendor(&storage, "ops@acme.com", "vt-1");

        assert_eq!(manager.authenticate_vendor("vt-1", "ops@acme.com").unwrap().vendor_id, "7");
        assert!(matches!(
            manager.authenticate_vendor("vt-2", "ops@acme.com"),
            Err(SessionError::Unauthorized)
        ));
        assert!(matches!(
            manager.authenticate_vendor("vt-1", "other@acme.com"),
            Err(SessionError::Unauthorized)
        ));
    }

    #[test]
    fn session_is_reused_then_recreated_after_revocation() {
        let (_temp, _storage, manager) = setup();

        let first = manager.get_or_create_session("42", "7").unwrap();
        assert!(first.created);
        let second = manager.get_or_create_session("42", "7").unwrap();
        assert!(!second.created);
        assert_eq!(first.session.session_id, second.session.session_id);
        assert_eq!(first.session.expires_at, second.session.expires_at);

        let revoked = manager.revoke(&first.session.session_id, "auditor").unwrap();
        assert!(!revoked.is_active);
        assert_eq!(revoked.revoked_by.as_deref(), Some("auditor"));

        let third = manager.get_or_create_session("42", "7").unwrap();
        assert!(third.created);
        assert_ne!(third.session.session_id, first.session.session_id);
        assert!(!manager.get(&first.session.session_id).unwrap().is_active);
    }

    #[test]
    fn expired_session_is_replaced() {
        let (_temp, storage, manager) = setup();

        let first = manager.get_or_create_session("42", "7").unwrap().session;
        let mut forced = first.clone();
        forced.expires_at = Utc::now() - Duration::seconds(1);
        SessionRepository::new(&storage).update(&forced).unwrap();

        let next = manager.get_or_create_session("42", "7").unwrap().session;
        assert_ne!(next.session_id, first.session_id);
    }

    #[test]
    fn session_token_binds_pair_and_expiry() {
        let (_temp, _storage, manager) = setup();
        let session = manager.get_or_create_session("42", "7").unwrap().session;

        let claims = verify_session_token(SECRET, &session.session_token).unwrap();
        assert_eq!(claims.user_id, "42");
        assert_eq!(claims.vendor_id, "7");
        assert_eq!(claims.exp, session.expires_at.timestamp());
    }

    #[test]
    fn revoke_missing_or_inactive_is_not_found() {
        let (_temp, _storage, manager) = setup();

        let missing = uuid::Uuid::new_v4().to_string();
        assert!(matches!(
            manager.revoke(&missing, "auditor"),
            Err(SessionError::NotFound(_))
        ));

        let session = manager.get_or_create_session("42", "7").unwrap().session;
        manager.revoke(&session.session_id, "auditor").unwrap();
        assert!(matches!(
            manager.revoke(&session.session_id, "auditor"),
            Err(SessionError::NotFound(_))
        ));
    }

    #[test]
    fn concurrent_first_requests_share_one_session() {
        let (_temp, _storage, manager) = setup();
        let manager = Arc::new(manager);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                std::thread::spawn(move || manager.get_or_create_session("42", "7").unwrap())
            })
            .collect();
        let grants: Vec<SessionGrant> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let created = grants.iter().filter(|g| g.created).count();
        assert_eq!(created, 1);
        assert!(grants
            .iter()
            .all(|g| g.session.session_id == grants[0].session.session_id));
        assert!(manager.lock_map().is_empty());
    }

    #[test]
    fn pair_locks_are_released_under_contention() {
        let (_temp, _storage, manager) = setup();
        let manager = Arc::new(manager);

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let manager = Arc::clone(&manager);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        let grant = manager.get_or_create_session("42", "7").unwrap();
                        if i % 4 == 0 {
                            let _ = manager.revoke(&grant.session.session_id, "auditor");
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(manager.lock_map().is_empty());
    }

    #[test]
    fn list_active_joins_parties() {
        let (_temp, storage, manager) = setup();
        verified_vendor(&storage, "ops@acme.com", "vt-1");

        let kept = manager.get_or_create_session("42", "7").unwrap().session;
        let gone = manager.get_or_create_session("43", "7").unwrap().session;
        manager.revoke(&gone.session_id, "auditor").unwrap();

        let active = manager.list_active(Utc::now()).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].session_id, kept.session_id);
        assert_eq!(active[0].vendor_name.as_deref(), Some("Acme"));
        assert!(active[0].user_email.is_none());
    }
}
