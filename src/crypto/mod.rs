// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Cryptography
//!
//! - `cipher` - client-side AES-256-GCM encryption of shared files. The
//!   server only ever stores the resulting ciphertext and IV.
//! - `password` - PBKDF2 hashing of vendor and account passwords.

pub mod cipher;
pub mod password;

pub use cipher::{
    decrypt, CryptoEngine, EncryptedPayload, FileKey, Iv, KeySource, SystemKeySource, IV_LEN,
    KEY_LEN, TAG_LEN,
};
pub use password::{hash_password, verify_password};

/// Errors from cryptographic operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// No secure randomness or cipher primitive is available.
    #[error("cryptographic primitives unavailable")]
    Unavailable,
    /// Tag verification failed: the ciphertext was altered or the key/IV is wrong.
    #[error("authentication failed: ciphertext is corrupted or the key is wrong")]
    AuthenticationFailed,
    #[error("invalid key material")]
    InvalidKey,
    #[error("invalid initialization vector")]
    InvalidIv,
}
