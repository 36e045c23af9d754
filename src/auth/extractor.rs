// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for portal principals and vendor credentials.
//!
//! Use the `Auth` extractor in handlers to require a portal bearer token:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use super::{tokens::verify_portal_token, AuthError, AuthenticatedUser, Capability};
use crate::state::AppState;

/// Header carrying the vendor token on facility calls.
pub const VENDOR_TOKEN_HEADER: &str = "vendor-token";

/// Header carrying the vendor email on facility calls.
pub const VENDOR_EMAIL_HEADER: &str = "vendor-email";

/// Extractor for authenticated portal users.
///
/// Validates the HS256 bearer token from the Authorization header against
/// `PORTAL_JWT_SECRET`.
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // First check if an outer layer already set the user
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidAuthHeader)?;

        let user = verify_portal_token(&state.config.portal_jwt_secret, token.trim())?;
        Ok(Auth(user))
    }
}

/// Extractor that requires the bank employee capabilities
/// (vendor management and audit review).
pub struct BankEmployeeOnly(pub AuthenticatedUser);

impl FromRequestParts<AppState> for BankEmployeeOnly {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;

        if !(user.can(Capability::ManageVendors) && user.can(Capability::ReviewAudit)) {
            return Err(AuthError::InsufficientPermissions);
        }

        Ok(BankEmployeeOnly(user))
    }
}

/// Credentials a vendor presents on a facility call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorCredentials {
    pub token: String,
    pub email: String,
}

impl VendorCredentials {
    /// Token from the `vendor-token` header; email from the request body
    /// when given, else from the `vendor-email` header.
    pub fn from_headers(headers: &HeaderMap, body_email: Option<&str>) -> Result<Self, AuthError> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let token = header(VENDOR_TOKEN_HEADER).ok_or(AuthError::MissingVendorCredentials)?;
        let email = body_email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .or_else(|| header(VENDOR_EMAIL_HEADER))
            .ok_or(AuthError::MissingVendorCredentials)?;

        Ok(Self { token, email })
    }
}
