// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! AES-256-GCM file encryption.
//!
//! Output layout is `ciphertext || tag` (16-byte tag), the same layout
//! WebCrypto produces for `AES-GCM`, so a file encrypted here can be
//! decrypted in the vendor's browser and vice versa.

use base64ct::{Base64, Encoding};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};

use super::CryptoError;

/// Symmetric key length in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// Nonce/IV length in bytes (96 bits).
pub const IV_LEN: usize = 12;

/// Authentication tag length appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Source of cryptographically secure random bytes.
pub trait KeySource: Send + Sync {
    fn fill(&self, dest: &mut [u8]) -> Result<(), CryptoError>;
}

/// Operating-system randomness.
#[derive(Debug)]
pub struct SystemKeySource {
    rng: SystemRandom,
}

impl SystemKeySource {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }
}

impl Default for SystemKeySource {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySource for SystemKeySource {
    fn fill(&self, dest: &mut [u8]) -> Result<(), CryptoError> {
        self.rng.fill(dest).map_err(|_| CryptoError::Unavailable)
    }
}

/// A 256-bit file key. Never persisted server-side.
#[derive(Clone, PartialEq, Eq)]
pub struct FileKey([u8; KEY_LEN]);

impl FileKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; KEY_LEN] = bytes.try_into().map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self(key))
    }

    /// Standard base64 (with padding), the form carried in share links.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = Base64::decode_vec(encoded.trim()).map_err(|_| CryptoError::InvalidKey)?;
        Self::from_bytes(&bytes)
    }

    pub fn to_base64(&self) -> String {
        Base64::encode_string(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for FileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FileKey(<redacted>)")
    }
}

/// A 96-bit initialization vector. Stored alongside the ciphertext; not secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Iv([u8; IV_LEN]);

impl Iv {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let iv: [u8; IV_LEN] = bytes.try_into().map_err(|_| CryptoError::InvalidIv)?;
        Ok(Self(iv))
    }

    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = Base64::decode_vec(encoded.trim()).map_err(|_| CryptoError::InvalidIv)?;
        Self::from_bytes(&bytes)
    }

    pub fn to_base64(&self) -> String {
        Base64::encode_string(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Result of encrypting one file.
#[derive(Debug, Clone)]
pub struct EncryptedPayload {
    /// `ciphertext || tag`.
    pub ciphertext: Vec<u8>,
    pub key: FileKey,
    pub iv: Iv,
    pub mime_type: String,
}

/// Client-side authenticated encryption of file payloads.
pub struct CryptoEngine<R: KeySource = SystemKeySource> {
    source: R,
}

impl CryptoEngine<SystemKeySource> {
    pub fn new() -> Self {
        Self {
            source: SystemKeySource::new(),
        }
    }
}

impl Default for CryptoEngine<SystemKeySource> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: KeySource> CryptoEngine<R> {
    /// Engine drawing keys and IVs from a specific source.
    pub fn with_source(source: R) -> Self {
        Self { source }
    }

    /// Encrypt `plaintext` under a fresh key and a fresh IV.
    ///
    /// Every call draws new key material, so no (key, iv) pair is ever
    /// shared between two files.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        mime_type: &str,
    ) -> Result<EncryptedPayload, CryptoError> {
        let mut key_bytes = [0u8; KEY_LEN];
        let mut iv_bytes = [0u8; IV_LEN];
        self.source.fill(&mut key_bytes)?;
        self.source.fill(&mut iv_bytes)?;

        let key = FileKey(key_bytes);
        let iv = Iv(iv_bytes);

        let sealing_key = aead_key(&key)?;
        let mut in_out = plaintext.to_vec();
        sealing_key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(iv.0),
                Aad::empty(),
                &mut in_out,
            )
            .map_err(|_| CryptoError::Unavailable)?;

        let mime_type = if mime_type.trim().is_empty() {
            "application/octet-stream".to_string()
        } else {
            mime_type.to_string()
        };

        Ok(EncryptedPayload {
            ciphertext: in_out,
            key,
            iv,
            mime_type,
        })
    }

    /// Decrypt and verify `ciphertext || tag`.
    ///
    /// Any tampering with the ciphertext or tag, or a wrong key or IV,
    /// yields `AuthenticationFailed`; altered plaintext is never returned.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        key: &FileKey,
        iv: &Iv,
    ) -> Result<Vec<u8>, CryptoError> {
        decrypt(ciphertext, key, iv)
    }
}

/// Decrypt without an engine; decryption needs no randomness.
pub fn decrypt(ciphertext: &[u8], key: &FileKey, iv: &Iv) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() < TAG_LEN {
        return Err(CryptoError::AuthenticationFailed);
    }

    let opening_key = aead_key(key)?;
    let mut in_out = ciphertext.to_vec();
    let plaintext_len = opening_key
        .open_in_place(Nonce::assume_unique_for_key(iv.0), Aad::empty(), &mut in_out)
        .map_err(|_| CryptoError::AuthenticationFailed)?
        .len();
    in_out.truncate(plaintext_len);
    Ok(in_out)
}

fn aead_key(key: &FileKey) -> Result<LessSafeKey, CryptoError> {
    let unbound = UnboundKey::new(&AES_256_GCM, &key.0).map_err(|_| CryptoError::InvalidKey)?;
    Ok(LessSafeKey::new(unbound))
}
