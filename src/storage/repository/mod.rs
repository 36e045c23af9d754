// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to storage.
//!
//! Each repository provides CRUD operations for a specific entity type,
//! using the FsStorage for all file operations.

pub mod accounts;
pub mod files;
pub mod sessions;
pub mod vendors;

pub use accounts::{AccountRepository, BankAccount, SeedAccount, SeedError};
pub use files::{FileAccessError, FileRecord, FileRepository, NewFile, Revocation};
pub use sessions::{SessionRepository, StoredSession};
pub use vendors::{
    VendorRepository, VendorRequest, VendorRequestSummary, VerifiedVendor, VerifiedVendorSummary,
};
