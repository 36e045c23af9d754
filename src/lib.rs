// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sharden - Encrypted File Sharing & Vendor Session Service
//!
//! Bank employees share files with third-party vendors. Files are encrypted
//! on the sender's machine; the server only custodies ciphertext, enforces
//! expiry and revocation on every download, and never sees a key. Vendors
//! call bank facilities through revocable, audited sessions.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Portal roles, bearer tokens and vendor credentials
//! - `client` - Encrypt/upload/link and link/download/decrypt flows
//! - `crypto` - AES-256-GCM file encryption and password hashing
//! - `sessions` - Vendor session issuance, reuse and revocation
//! - `share_link` - Share links carrying the key in the fragment
//! - `storage` - Filesystem persistence and audit streams
//! - `vendors` - Vendor registration and approval

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod models;
pub mod sessions;
pub mod share_link;
pub mod state;
pub mod storage;
pub mod telemetry;
pub mod vendors;
