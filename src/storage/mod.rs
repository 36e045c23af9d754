// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent storage on the local filesystem. One JSON file per entity,
//! opaque blobs for ciphertext, and daily JSONL files for audit streams.
//!
//! ## Storage Layout
//!
//! ```text
//! /data/
//!   files/{file_id}.json             # File metadata (iv, expiry, revoked)
//!   blobs/{file_id}.bin              # Ciphertext, never the key
//!   sessions/{session_id}.json       # Vendor sessions
//!   vendor_requests/{email_key}.json # Pending vendor registrations
//!   verified_vendors/{email_key}.json
//!   accounts/{email_key}.json        # Bank accounts for the balance facility
//!   audit/
//!     access/{date}/events.jsonl     # Facility invocations
//!     files/{date}/events.jsonl      # Upload/download/revoke events
//! ```
//!
//! ## Consistency
//!
//! - Record and blob writes are staged and renamed into place (all-or-nothing)
//! - Create-only writes fail with `AlreadyExists` instead of overwriting
//! - Every read goes to disk; nothing is cached, so a revocation is seen by
//!   the next request

pub mod audit;
pub mod fs;
pub mod paths;
pub mod repository;

pub use audit::{
    AccessLogEntry, AccessStatus, AuditRepository, FileAction, FileAuditEvent,
    UNAUTHENTICATED_SESSION,
};
pub use fs::{FsStorage, StorageError, StorageResult};
pub use paths::StoragePaths;
pub use repository::{
    AccountRepository, BankAccount, FileAccessError, FileRecord, FileRepository, NewFile,
    Revocation, SessionRepository, StoredSession, VendorRepository, VendorRequest,
    VendorRequestSummary, VerifiedVendor, VerifiedVendorSummary,
};
