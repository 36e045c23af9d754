// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. All types derive `ToSchema`
//! for the OpenAPI document served at `/docs`.
//!
//! ## Model Categories
//!
//! - **Files**: upload results, listings, revocation
//! - **Vendors**: registration, promotion, removal
//! - **Facilities**: the vendor-mediated balance lookup
//! - **Sessions**: active session listing and revocation
//! - **Audit**: access log and file event listings
//!
//! Facility and session bodies use camelCase keys (`accountNumber`,
//! `vendorEmail`, `sessionId`, `revokedBy`) because vendor integrations send
//! them that way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::sessions::ActiveSession;
use crate::storage::{
    AccessLogEntry, FileAuditEvent, FileRecord, VendorRequestSummary, VerifiedVendorSummary,
};

/// Plain acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// =============================================================================
// Files
// =============================================================================

/// Response after storing an uploaded ciphertext.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,
    pub file: FileRecord,
}

/// Identity filter for file listings. With neither set, all files are listed.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FileListQuery {
    /// Files sent by this email
    pub sender: Option<String>,
    /// Files addressed to this email
    pub recipient: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileListResponse {
    pub files: Vec<FileRecord>,
    pub total: usize,
}

/// Response after a revocation request. Repeating the request succeeds.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RevokeFileResponse {
    pub message: String,
    pub file: FileRecord,
}

/// Optional attribution for a revocation or download.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActorQuery {
    /// Email of the person performing the action
    pub by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileEventListResponse {
    pub events: Vec<FileAuditEvent>,
    pub total: usize,
}

// =============================================================================
// Vendors
// =============================================================================

/// Self-registration of a vendor awaiting approval.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterVendorRequest {
    #[serde(default)]
    pub vendor_name: String,
    #[serde(default)]
    pub vendor_email: String,
    #[serde(default)]
    pub vendor_password: String,
    #[serde(default)]
    pub vendor_documentation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterVendorResponse {
    pub message: String,
    pub request: VendorRequestSummary,
}

/// Promotion of a vendor to verified status.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyVendorRequest {
    #[serde(default)]
    pub vendor_name: String,
    #[serde(default)]
    pub vendor_email: String,
    /// Taken from the pending request when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_password: Option<String>,
}

/// A freshly verified vendor. The token is shown once, to hand to the vendor.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyVendorResponse {
    pub message: String,
    pub vendor_id: String,
    pub vendor_name: String,
    pub vendor_email: String,
    pub vendor_token: String,
    pub verified_at: DateTime<Utc>,
}

/// Removal of a pending or verified vendor, keyed by email.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteVendorRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VendorRequestListResponse {
    pub requests: Vec<VendorRequestSummary>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifiedVendorListResponse {
    pub vendors: Vec<VerifiedVendorSummary>,
    pub total: usize,
}

// =============================================================================
// Facilities
// =============================================================================

/// End-user credentials presented by a vendor on a balance lookup.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BalanceRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub account_number: String,
    /// Overrides the `vendor-email` header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    /// Decimal string with two fraction digits
    pub balance: String,
    pub currency: String,
    pub account_number: String,
    pub session_id: String,
    pub session_token: String,
    pub expires_at: DateTime<Utc>,
}

// =============================================================================
// Sessions
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionListResponse {
    pub sessions: Vec<ActiveSession>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevokeSessionRequest {
    #[serde(default)]
    pub session_id: String,
    /// Defaults to the caller's email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RevokeSessionResponse {
    pub message: String,
    pub session_id: String,
    pub revoked_by: String,
    pub revoked_at: DateTime<Utc>,
}

// =============================================================================
// Audit
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccessLogListResponse {
    pub entries: Vec<AccessLogEntry>,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_request_uses_camel_case_keys() {
        let body: BalanceRequest = serde_json::from_str(
            r#"{"email":"u@bank.com","password":"pw","accountNumber":"ACC-1","vendorEmail":"ops@acme.com"}"#,
        )
        .unwrap();
        assert_eq!(body.account_number, "ACC-1");
        assert_eq!(body.vendor_email.as_deref(), Some("ops@acme.com"));
    }

    #[test]
    fn missing_fields_deserialize_empty_for_validation() {
        let body: BalanceRequest = serde_json::from_str(r#"{"email":"u@bank.com"}"#).unwrap();
        assert!(body.password.is_empty());
        assert!(body.vendor_email.is_none());

        let body: RevokeSessionRequest = serde_json::from_str(r#"{"sessionId":"s-1"}"#).unwrap();
        assert_eq!(body.session_id, "s-1");
        assert!(body.revoked_by.is_none());
    }
}
