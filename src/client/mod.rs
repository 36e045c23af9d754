// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Sharing Client
//!
//! The end-to-end half of file sharing, run by the bank employee and the
//! vendor rather than by the server:
//!
//! - [`ShareClient::share`] encrypts locally, uploads ciphertext and IV,
//!   remembers the key and returns the share link
//! - [`ShareClient::open`] parses a link, downloads the ciphertext and
//!   decrypts locally
//!
//! The key is only ever placed in the link fragment and the local
//! [`KeyCache`]; no request made here carries it.

pub mod key_cache;

use std::time::Duration;

use reqwest::{multipart, Client, Response};
use url::form_urlencoded;

use crate::crypto::{self, CryptoEngine, CryptoError, Iv};
use crate::error::{ErrorBody, ErrorKind};
use crate::models::{RevokeFileResponse, UploadResponse};
use crate::share_link::{build_link, parse_link, LinkError};
use crate::storage::FileRecord;

pub use key_cache::{FileKeyCache, KeyCache, KeyCacheError, MemoryKeyCache};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Link(#[from] LinkError),
    /// The link had no key and none was cached for the file.
    #[error("No decryption key available for file {0}")]
    MissingKey(String),
    /// Local encryption or decryption failed. `AuthenticationFailed` means
    /// the ciphertext is corrupted or the key is wrong; retrying won't help.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    /// The server answered with an error.
    #[error("Server rejected the request ({status}, {kind}): {message}")]
    Server {
        status: u16,
        kind: ErrorKind,
        message: String,
    },
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Unexpected server response: {0}")]
    InvalidResponse(String),
    #[error(transparent)]
    KeyCache(#[from] KeyCacheError),
}

/// A file to share.
#[derive(Debug, Clone)]
pub struct ShareRequest<'a> {
    pub plaintext: &'a [u8],
    pub file_name: &'a str,
    pub mime_type: &'a str,
    pub sender_email: &'a str,
    pub recipient_email: &'a str,
    /// Overrides the server's default file lifetime.
    pub expires_in: Option<chrono::Duration>,
}

/// A stored share and the link to hand to the recipient.
#[derive(Debug, Clone)]
pub struct SharedFile {
    pub record: FileRecord,
    pub link: String,
}

/// A downloaded and decrypted file.
#[derive(Debug, Clone)]
pub struct OpenedFile {
    pub record: FileRecord,
    pub plaintext: Vec<u8>,
}

/// HTTP client for the share and open flows.
pub struct ShareClient<K: KeyCache = MemoryKeyCache> {
    server_base: String,
    vendor_portal_base: String,
    http: Client,
    engine: CryptoEngine,
    keys: K,
}

impl<K: KeyCache> ShareClient<K> {
    pub fn new(
        server_base: impl Into<String>,
        vendor_portal_base: impl Into<String>,
        keys: K,
    ) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            server_base: server_base.into().trim_end_matches('/').to_string(),
            vendor_portal_base: vendor_portal_base.into(),
            http,
            engine: CryptoEngine::new(),
            keys,
        })
    }

    pub fn keys(&self) -> &K {
        &self.keys
    }

    /// Encrypt, upload, cache the key and build the share link.
    pub async fn share(&self, request: ShareRequest<'_>) -> Result<SharedFile, ClientError> {
        let payload = self.engine.encrypt(request.plaintext, request.mime_type)?;

        let file_part = multipart::Part::bytes(payload.ciphertext)
            .file_name(format!("{}.enc", request.file_name))
            .mime_str("application/octet-stream")
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let mut form = multipart::Form::new()
            .text("sender_email", request.sender_email.to_string())
            .text("recipient_email", request.recipient_email.to_string())
            .text("original_name", request.file_name.to_string())
            .text("mime_type", payload.mime_type.clone())
            .text("iv_b64", payload.iv.to_base64())
            .text("original_size", request.plaintext.len().to_string())
            .part("file", file_part);
        if let Some(expires_in) = request.expires_in {
            form = form.text("expires_in_seconds", expires_in.num_seconds().to_string());
        }

        let response = self
            .http
            .post(self.url("/api/files"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("POST /api/files failed: {e}")))?;
        let uploaded: UploadResponse = json_or_error(response).await?;

        self.keys.set(&uploaded.file.file_id, &payload.key)?;
        let link = build_link(&self.vendor_portal_base, &uploaded.file.file_id, &payload.key)?;

        tracing::debug!(file_id = %uploaded.file.file_id, "Shared file");
        Ok(SharedFile {
            record: uploaded.file,
            link,
        })
    }

    /// Download and decrypt the file a share link points at.
    ///
    /// The key comes from the link fragment, or from the key cache when the
    /// link carries none.
    pub async fn open(&self, link: &str) -> Result<OpenedFile, ClientError> {
        let link = parse_link(link)?;
        let key = match link.key {
            Some(key) => key,
            None => self
                .keys
                .get(&link.file_id)
                .ok_or_else(|| ClientError::MissingKey(link.file_id.clone()))?,
        };

        let response = self
            .http
            .get(self.url(&format!("/api/files/{}", link.file_id)))
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("GET metadata failed: {e}")))?;
        let record: FileRecord = json_or_error(response).await?;

        let response = self
            .http
            .get(self.url(&format!("/api/files/{}/download", link.file_id)))
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("GET download failed: {e}")))?;
        let response = error_for_status(response).await?;
        let ciphertext = response
            .bytes()
            .await
            .map_err(|e| ClientError::Transport(format!("reading ciphertext failed: {e}")))?;

        let iv = Iv::from_base64(&record.iv)?;
        let plaintext = crypto::decrypt(&ciphertext, &key, &iv)?;

        Ok(OpenedFile { record, plaintext })
    }

    /// Revoke a file on the server. Repeating the call succeeds.
    pub async fn revoke(
        &self,
        file_id: &str,
        revoked_by: Option<&str>,
    ) -> Result<FileRecord, ClientError> {
        let mut path = format!("/api/files/{file_id}/revoke");
        if let Some(by) = revoked_by {
            let by: String = form_urlencoded::byte_serialize(by.as_bytes()).collect();
            path.push_str(&format!("?by={by}"));
        }
        let response = self
            .http
            .post(self.url(&path))
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("POST revoke failed: {e}")))?;
        let revoked: RevokeFileResponse = json_or_error(response).await?;
        Ok(revoked.file)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.server_base, path)
    }
}

async fn error_for_status(response: Response) -> Result<Response, ClientError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let error = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => ClientError::Server {
            status,
            kind: parsed.kind,
            message: parsed.error,
        },
        Err(_) => ClientError::InvalidResponse(format!("status {status}: {body}")),
    };
    Err(error)
}

async fn json_or_error<T: serde::de::DeserializeOwned>(
    response: Response,
) -> Result<T, ClientError> {
    error_for_status(response)
        .await?
        .json()
        .await
        .map_err(|e| ClientError::InvalidResponse(e.to_string()))
}
