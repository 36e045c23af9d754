// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Two kinds of callers reach the API:
//!
//! 1. Portal principals (bank employees, vendors, end users) send
//!    `Authorization: Bearer <HS256 JWT>` with `{sub: email, role, exp}`.
//!    The token is minted by the portal's identity provider with the shared
//!    `PORTAL_JWT_SECRET`.
//! 2. Vendor integrations calling bank facilities send `vendor-token` and
//!    `vendor-email`; these are matched against the verified vendor table
//!    (see `crate::sessions`).
//!
//! ## Security
//!
//! - Roles map to capabilities through [`Role::can`] only
//! - Clock skew tolerance is 60 seconds
//! - Tokens and passwords are never logged

pub mod claims;
pub mod error;
pub mod extractor;
pub mod roles;
pub mod tokens;

pub use claims::{AuthenticatedUser, SessionClaims, VendorClaims};
pub use error::AuthError;
pub use extractor::{Auth, BankEmployeeOnly, VendorCredentials};
pub use roles::{Capability, Role};
