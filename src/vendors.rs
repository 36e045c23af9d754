// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Vendor registration and approval.
//!
//! A vendor self-registers (a pending request), a bank employee either
//! promotes the request to a verified vendor with a freshly issued token,
//! or rejects it. Promotion is at most once per email.

use std::sync::{Mutex, PoisonError};

use chrono::Utc;

use crate::auth::tokens::issue_vendor_token;
use crate::crypto::hash_password;
use crate::identity::{is_valid_email, normalize_email};
use crate::storage::{
    FsStorage, StorageError, VendorRepository, VendorRequest, VendorRequestSummary,
    VerifiedVendor, VerifiedVendorSummary,
};

#[derive(Debug, thiserror::Error)]
pub enum VendorError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Not found: {0}")]
    NotFound(String),
    /// Password hashing failed.
    #[error("Failed to protect vendor credentials: {0}")]
    Credential(String),
    #[error("Error generating verification token: {0}")]
    Token(String),
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for VendorError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(what) => VendorError::NotFound(what),
            StorageError::AlreadyExists(what) => {
                VendorError::Conflict(format!("{what} already exists"))
            }
            other => VendorError::Storage(other),
        }
    }
}

/// A self-registration as submitted.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub vendor_name: String,
    pub vendor_email: String,
    pub vendor_password: String,
    pub vendor_documentation: String,
}

/// A promotion request from a bank employee.
#[derive(Debug, Clone, Default)]
pub struct Promotion {
    pub vendor_name: String,
    pub vendor_email: String,
    /// Falls back to the password of the pending request when absent.
    pub vendor_password: Option<String>,
}

/// Vendor workflow over the vendor tables.
pub struct VendorRegistry {
    storage: FsStorage,
    token_secret: Vec<u8>,
    promotions: Mutex<()>,
}

impl VendorRegistry {
    pub fn new(storage: FsStorage, token_secret: Vec<u8>) -> Self {
        Self {
            storage,
            token_secret,
            promotions: Mutex::new(()),
        }
    }

    /// Record a pending registration.
    pub fn submit_request(
        &self,
        registration: Registration,
    ) -> Result<VendorRequestSummary, VendorError> {
        let Registration {
            vendor_name,
            vendor_email,
            vendor_password,
            vendor_documentation,
        } = registration;

        require_fields(&[
            ("vendor_name", &vendor_name),
            ("vendor_email", &vendor_email),
            ("vendor_password", &vendor_password),
            ("vendor_documentation", &vendor_documentation),
        ])?;
        let vendor_email = checked_email(&vendor_email)?;

        let repo = VendorRepository::new(&self.storage);
        if repo.get_verified(&vendor_email).is_ok() {
            return Err(VendorError::Conflict(
                "Vendor with this email is already verified".to_string(),
            ));
        }

        let request = VendorRequest {
            vendor_name: vendor_name.trim().to_string(),
            vendor_email,
            password_hash: hash_password(&vendor_password)
                .map_err(|e| VendorError::Credential(e.to_string()))?,
            vendor_documentation: vendor_documentation.trim().to_string(),
            requested_at: Utc::now(),
        };

        repo.create_request(&request).map_err(|e| match e {
            StorageError::AlreadyExists(_) => VendorError::Conflict(
                "A verification request for this email is already pending".to_string(),
            ),
            other => other.into(),
        })?;

        tracing::info!(vendor_email = %request.vendor_email, "Vendor verification requested");
        Ok(request.into())
    }

    /// Promote a vendor: create the verified record with a new token and
    /// drop the pending request, if any.
    pub fn verify(&self, promotion: Promotion) -> Result<VerifiedVendor, VendorError> {
        require_fields(&[
            ("vendor_name", &promotion.vendor_name),
            ("vendor_email", &promotion.vendor_email),
        ])?;
        let vendor_email = checked_email(&promotion.vendor_email)?;
        let vendor_name = promotion.vendor_name.trim().to_string();

        let _serialized = self.promotions.lock().unwrap_or_else(PoisonError::into_inner);
        let repo = VendorRepository::new(&self.storage);

        if repo.get_verified(&vendor_email).is_ok() {
            return Err(VendorError::Conflict(
                "Vendor with this email is already verified".to_string(),
            ));
        }

        let pending = match repo.get_request(&vendor_email) {
            Ok(request) => Some(request),
            Err(StorageError::NotFound(_)) => None,
            Err(e) => return Err(e.into()),
        };

        let password_hash = match (promotion.vendor_password.as_deref(), &pending) {
            (Some(password), _) if !password.trim().is_empty() => {
                hash_password(password).map_err(|e| VendorError::Credential(e.to_string()))?
            }
            (_, Some(request)) => request.password_hash.clone(),
            _ => {
                return Err(VendorError::Validation(
                    "All fields are required: vendor_name, vendor_email, vendor_password"
                        .to_string(),
                ))
            }
        };

        let vendor_token = issue_vendor_token(&self.token_secret, &vendor_email, &vendor_name)
            .map_err(|e| VendorError::Token(e.to_string()))?;

        let vendor = VerifiedVendor {
            vendor_id: uuid::Uuid::new_v4().to_string(),
            vendor_name,
            vendor_email,
            vendor_token,
            password_hash,
            verified_at: Utc::now(),
        };
        repo.create_verified(&vendor).map_err(|e| match e {
            StorageError::AlreadyExists(_) => VendorError::Conflict(
                "Vendor with this email is already verified".to_string(),
            ),
            other => other.into(),
        })?;

        match repo.delete_request(&vendor.vendor_email) {
            Ok(()) | Err(StorageError::NotFound(_)) => {}
            Err(e) => tracing::warn!(
                error = %e,
                vendor_email = %vendor.vendor_email,
                "Verified vendor but could not remove the pending request"
            ),
        }

        tracing::info!(
            vendor_id = %vendor.vendor_id,
            vendor_email = %vendor.vendor_email,
            "Vendor verified"
        );
        Ok(vendor)
    }

    /// Reject a pending request (hard delete).
    pub fn reject(&self, email: &str) -> Result<(), VendorError> {
        VendorRepository::new(&self.storage).delete_request(email)?;
        tracing::info!(vendor_email = %normalize_email(email), "Vendor request deleted");
        Ok(())
    }

    /// Remove a verified vendor (hard delete). Their token stops working
    /// on the next facility call.
    pub fn remove_verified(&self, email: &str) -> Result<(), VendorError> {
        VendorRepository::new(&self.storage).delete_verified(email)?;
        tracing::info!(vendor_email = %normalize_email(email), "Verified vendor deleted");
        Ok(())
    }

    pub fn list_requests(&self) -> Result<Vec<VendorRequestSummary>, VendorError> {
        Ok(VendorRepository::new(&self.storage)
            .list_requests()?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    pub fn list_verified(&self) -> Result<Vec<VerifiedVendorSummary>, VendorError> {
        Ok(VendorRepository::new(&self.storage)
            .list_verified()?
            .into_iter()
            .map(Into::into)
            .collect())
    }
}

fn require_fields(fields: &[(&str, &String)]) -> Result<(), VendorError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(VendorError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }
}

fn checked_email(email: &str) -> Result<String, VendorError> {
    if !is_valid_email(email) {
        return Err(VendorError::Validation("Invalid email format".to_string()));
    }
    Ok(normalize_email(email))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tokens::verify_vendor_token;
    use crate::crypto::verify_password;
    use crate::storage::StoragePaths;
    use tempfile::TempDir;

    const SECRET: &[u8] = b"vendor-secret";

    fn setup() -> (TempDir, FsStorage, VendorRegistry) {
        let temp = TempDir::new().unwrap();
        let mut storage = FsStorage::new(StoragePaths::new(temp.path()));
        storage.initialize().unwrap();
        let registry = VendorRegistry::new(storage.clone(), SECRET.to_vec());
        (temp, storage, registry)
    }

    fn registration(email: &str) -> Registration {
        Registration {
            vendor_name: "Acme Analytics".to_string(),
            vendor_email: email.to_string(),
            vendor_password: "s3cret".to_string(),
            vendor_documentation: "https://acme.example/soc2.pdf".to_string(),
        }
    }

    #[test]
    fn submit_validates_before_writing() {
        let (_temp, _storage, registry) = setup();

        let mut missing = registration("ops@acme.com");
        missing.vendor_documentation = "  ".to_string();
        assert!(matches!(
            registry.submit_request(missing),
            Err(VendorError::Validation(msg)) if msg.contains("vendor_documentation")
        ));
        assert!(matches!(
            registry.submit_request(registration("not-an-email")),
            Err(VendorError::Validation(_))
        ));
        assert!(registry.list_requests().unwrap().is_empty());
    }

    #[test]
    fn duplicate_request_conflicts() {
        let (_temp, storage, registry) = setup();
        registry.submit_request(registration("Ops@Acme.com")).unwrap();
        assert!(matches!(
            registry.submit_request(registration("ops@acme.com")),
            Err(VendorError::Conflict(_))
        ));

        let stored = VendorRepository::new(&storage).get_request("ops@acme.com").unwrap();
        assert!(verify_password("s3cret", &stored.password_hash));
    }

    #[test]
    fn promotion_moves_request_to_verified() {
        let (_temp, storage, registry) = setup();
        registry.submit_request(registration("ops@acme.com")).unwrap();

        let vendor = registry
            .verify(Promotion {
                vendor_name: "Acme Analytics".to_string(),
                vendor_email: "ops@acme.com".to_string(),
                vendor_password: None,
            })
            .unwrap();

        let repo = VendorRepository::new(&storage);
        assert!(matches!(
            repo.get_request("ops@acme.com"),
            Err(StorageError::NotFound(_))
        ));
        assert_eq!(repo.get_verified("ops@acme.com").unwrap().vendor_id, vendor.vendor_id);

        let claims = verify_vendor_token(SECRET, &vendor.vendor_token).unwrap();
        assert_eq!(claims.vendor_email, "ops@acme.com");
        assert_eq!(claims.vendor_name, "Acme Analytics");
        let stored = repo.get_verified("ops@acme.com").unwrap();
        assert!(verify_password("s3cret", &stored.password_hash));
    }

    #[test]
    fn promotion_is_at_most_once() {
        let (_temp, _storage, registry) = setup();
        let promotion = Promotion {
            vendor_name: "Acme".to_string(),
            vendor_email: "ops@acme.com".to_string(),
            vendor_password: Some("pw".to_string()),
        };

        registry.verify(promotion.clone()).unwrap();
        assert!(matches!(
            registry.verify(promotion),
            Err(VendorError::Conflict(_))
        ));
        assert!(matches!(
            registry.submit_request(registration("ops@acme.com")),
            Err(VendorError::Conflict(_))
        ));
    }

    #[test]
    fn promotion_without_any_password_is_invalid() {
        let (_temp, _storage, registry) = setup();
        let result = registry.verify(Promotion {
            vendor_name: "Acme".to_string(),
            vendor_email: "ops@acme.com".to_string(),
            vendor_password: None,
        });
        assert!(matches!(result, Err(VendorError::Validation(_))));
        assert!(registry.list_verified().unwrap().is_empty());
    }

    #[test]
    fn reject_and_remove_are_hard_deletes() {
        let (_temp, _storage, registry) = setup();

        assert!(matches!(registry.reject("ghost@acme.com"), Err(VendorError::NotFound(_))));
        registry.submit_request(registration("ops@acme.com")).unwrap();
        registry.reject("ops@acme.com").unwrap();
        assert!(registry.list_requests().unwrap().is_empty());

        registry
            .verify(Promotion {
                vendor_name: "Acme".to_string(),
                vendor_email: "ops@acme.com".to_string(),
                vendor_password: Some("pw".to_string()),
            })
            .unwrap();
        registry.remove_verified("OPS@acme.com").unwrap();
        assert!(matches!(
            registry.remove_verified("ops@acme.com"),
            Err(VendorError::NotFound(_))
        ));
    }
}
