// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token claims and the authenticated portal principal.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::{Capability, Role};

/// Issuer of vendor tokens.
pub const VENDOR_TOKEN_ISSUER: &str = "vendor-verification-system";

/// Claims of a portal bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalClaims {
    /// Principal email
    pub sub: String,
    /// Role name, e.g. `bank_employee`
    pub role: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

/// Claims of a vendor session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub user_id: String,
    pub vendor_id: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims of a vendor token issued on verification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VendorClaims {
    pub vendor_email: String,
    pub vendor_name: String,
    pub iss: String,
    pub iat: i64,
}

/// Authenticated portal principal.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    pub email: String,
    pub role: Role,
    /// Token expiration (unix seconds)
    pub expires_at: i64,
}

impl AuthenticatedUser {
    pub fn can(&self, capability: Capability) -> bool {
        self.role.can(capability)
    }
}
