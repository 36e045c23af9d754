// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Vendor tables: pending registration requests and verified vendors.
//!
//! Both are keyed by the digest of the normalized vendor email, so one
//! email maps to at most one record per table.
//!
//! ```text
//! /data/vendor_requests/{email_key}.json
//! /data/verified_vendors/{email_key}.json
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::identity::email_key;

use super::super::{FsStorage, StorageError, StorageResult};

/// A pending self-registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VendorRequest {
    pub vendor_name: String,
    pub vendor_email: String,
    /// PBKDF2 hash, never the plaintext password
    pub password_hash: String,
    pub vendor_documentation: String,
    pub requested_at: DateTime<Utc>,
}

/// A vendor approved by a bank employee.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifiedVendor {
    /// Unique vendor identifier (UUID)
    pub vendor_id: String,
    pub vendor_name: String,
    pub vendor_email: String,
    /// Issued credential presented on facility calls
    pub vendor_token: String,
    pub password_hash: String,
    pub verified_at: DateTime<Utc>,
}

/// Public view of a pending request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VendorRequestSummary {
    pub vendor_name: String,
    pub vendor_email: String,
    pub vendor_documentation: String,
    pub requested_at: DateTime<Utc>,
}

impl From<VendorRequest> for VendorRequestSummary {
    fn from(r: VendorRequest) -> Self {
        Self {
            vendor_name: r.vendor_name,
            vendor_email: r.vendor_email,
            vendor_documentation: r.vendor_documentation,
            requested_at: r.requested_at,
        }
    }
}

/// Public view of a verified vendor (no token, no password).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifiedVendorSummary {
    pub vendor_id: String,
    pub vendor_name: String,
    pub vendor_email: String,
    pub verified_at: DateTime<Utc>,
}

impl From<VerifiedVendor> for VerifiedVendorSummary {
    fn from(v: VerifiedVendor) -> Self {
        Self {
            vendor_id: v.vendor_id,
            vendor_name: v.vendor_name,
            vendor_email: v.vendor_email,
            verified_at: v.verified_at,
        }
    }
}

/// Repository for both vendor tables.
pub struct VendorRepository<'a> {
    storage: &'a FsStorage,
}

impl<'a> VendorRepository<'a> {
    pub fn new(storage: &'a FsStorage) -> Self {
        Self { storage }
    }

    // ========== Pending Requests ==========

    /// Store a new request; `AlreadyExists` if one is pending for the email.
    pub fn create_request(&self, request: &VendorRequest) -> StorageResult<()> {
        let path = self
            .storage
            .paths()
            .vendor_request(&email_key(&request.vendor_email));
        self.storage.create_json(path, request).map_err(|e| match e {
            StorageError::AlreadyExists(_) => StorageError::AlreadyExists(format!(
                "Vendor request for {}",
                request.vendor_email
            )),
            other => other,
        })
    }

    pub fn get_request(&self, email: &str) -> StorageResult<VendorRequest> {
        let path = self.storage.paths().vendor_request(&email_key(email));
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Vendor request for {email}")));
        }
        self.storage.read_json(path)
    }

    pub fn delete_request(&self, email: &str) -> StorageResult<()> {
        let path = self.storage.paths().vendor_request(&email_key(email));
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Vendor request for {email}")));
        }
        self.storage.delete(path)
    }

    /// Pending requests, oldest first.
    pub fn list_requests(&self) -> StorageResult<Vec<VendorRequest>> {
        let dir = self.storage.paths().vendor_requests_dir();
        let mut requests: Vec<VendorRequest> = self
            .storage
            .list_files(&dir, "json")?
            .iter()
            .filter_map(|key| self.storage.read_json(self.storage.paths().vendor_request(key)).ok())
            .collect();
        requests.sort_by(|a, b| a.requested_at.cmp(&b.requested_at));
        Ok(requests)
    }

    // ========== Verified Vendors ==========

    /// Store a verified vendor; `AlreadyExists` if the email is verified.
    pub fn create_verified(&self, vendor: &VerifiedVendor) -> StorageResult<()> {
        let path = self
            .storage
            .paths()
            .verified_vendor(&email_key(&vendor.vendor_email));
        self.storage.create_json(path, vendor).map_err(|e| match e {
            StorageError::AlreadyExists(_) => {
                StorageError::AlreadyExists(format!("Verified vendor {}", vendor.vendor_email))
            }
            other => other,
        })
    }

    pub fn get_verified(&self, email: &str) -> StorageResult<VerifiedVendor> {
        let path = self.storage.paths().verified_vendor(&email_key(email));
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Verified vendor {email}")));
        }
        self.storage.read_json(path)
    }

    pub fn get_verified_by_id(&self, vendor_id: &str) -> StorageResult<VerifiedVendor> {
        self.list_verified()?
            .into_iter()
            .find(|v| v.vendor_id == vendor_id)
            .ok_or_else(|| StorageError::NotFound(format!("Vendor {vendor_id}")))
    }

    /// Hard delete; no tombstone is kept.
    pub fn delete_verified(&self, email: &str) -> StorageResult<()> {
        let path = self.storage.paths().verified_vendor(&email_key(email));
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Verified vendor {email}")));
        }
        self.storage.delete(path)
    }

    /// Verified vendors, oldest first.
    pub fn list_verified(&self) -> StorageResult<Vec<VerifiedVendor>> {
        let dir = self.storage.paths().verified_vendors_dir();
        let mut vendors: Vec<VerifiedVendor> = self
            .storage
            .list_files(&dir, "json")?
            .iter()
            .filter_map(|key| {
                self.storage
                    .read_json(self.storage.paths().verified_vendor(key))
                    .ok()
            })
            .collect();
        vendors.sort_by(|a, b| a.verified_at.cmp(&b.verified_at));
        Ok(vendors)
    }
}
