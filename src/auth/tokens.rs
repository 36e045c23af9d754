// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HS256 token issuance and verification.
//!
//! Three token families, each with its own secret:
//!
//! - portal bearer tokens `{sub, role, exp}` presented by employees and users
//! - vendor session tokens `{userId, vendorId, iat, exp}`
//! - vendor tokens `{vendor_email, vendor_name, iss}` issued on verification

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Serialize};

use super::claims::{
    AuthenticatedUser, PortalClaims, SessionClaims, VendorClaims, VENDOR_TOKEN_ISSUER,
};
use super::{AuthError, Role};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

fn sign<T: Serialize>(secret: &[u8], claims: &T) -> Result<String, AuthError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AuthError::InternalError(format!("Failed to sign token: {e}")))
}

fn verify<T: DeserializeOwned + Clone>(
    secret: &[u8],
    token: &str,
    validation: &Validation,
) -> Result<T, AuthError> {
    decode::<T>(token, &DecodingKey::from_secret(secret), validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            _ => AuthError::MalformedToken,
        })
}

fn hs256_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = CLOCK_SKEW_LEEWAY;
    validation
}

// ========== Portal Tokens ==========

pub fn issue_portal_token(
    secret: &[u8],
    email: &str,
    role: Role,
    ttl: Duration,
) -> Result<String, AuthError> {
    let now = Utc::now();
    sign(
        secret,
        &PortalClaims {
            sub: email.to_string(),
            role: role.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        },
    )
}

pub fn verify_portal_token(secret: &[u8], token: &str) -> Result<AuthenticatedUser, AuthError> {
    let mut validation = hs256_validation();
    validation.set_required_spec_claims(&["exp", "sub"]);

    let claims: PortalClaims = verify(secret, token, &validation)?;
    let role = Role::from_str(&claims.role).ok_or(AuthError::UnknownRole)?;

    Ok(AuthenticatedUser {
        email: claims.sub,
        role,
        expires_at: claims.exp,
    })
}

// ========== Session Tokens ==========

pub fn issue_session_token(
    secret: &[u8],
    user_id: &str,
    vendor_id: &str,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<String, AuthError> {
    sign(
        secret,
        &SessionClaims {
            user_id: user_id.to_string(),
            vendor_id: vendor_id.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        },
    )
}

pub fn verify_session_token(secret: &[u8], token: &str) -> Result<SessionClaims, AuthError> {
    verify(secret, token, &hs256_validation())
}

// ========== Vendor Tokens ==========

/// Vendor tokens carry no expiry; they stay valid until the vendor is removed.
pub fn issue_vendor_token(
    secret: &[u8],
    vendor_email: &str,
    vendor_name: &str,
) -> Result<String, AuthError> {
    sign(
        secret,
        &VendorClaims {
            vendor_email: vendor_email.to_string(),
            vendor_name: vendor_name.to_string(),
            iss: VENDOR_TOKEN_ISSUER.to_string(),
            iat: Utc::now().timestamp(),
        },
    )
}

pub fn verify_vendor_token(secret: &[u8], token: &str) -> Result<VendorClaims, AuthError> {
    let mut validation = hs256_validation();
    validation.validate_exp = false;
    validation.set_required_spec_claims(&["iss"]);
    validation.set_issuer(&[VENDOR_TOKEN_ISSUER]);
    verify(secret, token, &validation)
}
