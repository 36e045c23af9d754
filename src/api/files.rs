// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared file endpoints.
//!
//! The server only ever sees ciphertext and the IV. Keys travel in the
//! fragment of the share link and never reach these handlers.
//!
//! Access is decided per download: revocation and expiry are evaluated on
//! every call against freshly read metadata.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};

use crate::{
    crypto::Iv,
    error::ApiError,
    identity::{is_valid_email, normalize_email, same_email},
    models::{
        ActorQuery, FileEventListResponse, FileListQuery, FileListResponse, RevokeFileResponse,
        UploadResponse,
    },
    state::AppState,
    storage::{
        AuditRepository, FileAccessError, FileAction, FileAuditEvent, FileRecord, FileRepository,
        NewFile,
    },
};

/// Response header carrying the base64 IV of a downloaded ciphertext.
pub const IV_HEADER: &str = "x-sharden-iv";

/// Response header carrying the plaintext MIME type of a download.
pub const MIME_TYPE_HEADER: &str = "x-sharden-mime-type";

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Number of file events returned by `/api/logs`.
pub const FILE_EVENT_LIMIT: usize = 500;

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Fields collected from the upload form.
#[derive(Default)]
struct UploadForm {
    ciphertext: Option<Vec<u8>>,
    file_name: Option<String>,
    sender_email: Option<String>,
    recipient_email: Option<String>,
    original_name: Option<String>,
    mime_type: Option<String>,
    iv_b64: Option<String>,
    original_size: Option<String>,
    expires_in_seconds: Option<String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                form.file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file field: {e}")))?;
                form.ciphertext = Some(bytes.to_vec());
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read field {name}: {e}")))?;
            let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
            match name.as_str() {
                "sender_email" => form.sender_email = value,
                "recipient_email" => form.recipient_email = value,
                "original_name" => form.original_name = value,
                "mime_type" => form.mime_type = value,
                "iv_b64" => form.iv_b64 = value,
                "original_size" => form.original_size = value,
                "expires_in_seconds" => form.expires_in_seconds = value,
                _ => {}
            }
        }

        Ok(form)
    }

    /// Validate the collected fields. Nothing is persisted before this passes.
    fn into_new_file(self, default_expiry: Duration) -> Result<(Vec<u8>, NewFile), ApiError> {
        let ciphertext = self
            .ciphertext
            .ok_or_else(|| ApiError::validation("Missing required field: file"))?;
        let sender_email = required_email(self.sender_email, "sender_email")?;
        let recipient_email = required_email(self.recipient_email, "recipient_email")?;

        let iv = self
            .iv_b64
            .ok_or_else(|| ApiError::validation("Missing required field: iv_b64"))?;
        Iv::from_base64(&iv)
            .map_err(|_| ApiError::validation("iv_b64 must be a base64 96-bit IV"))?;

        let original_size = self
            .original_size
            .map(|s| s.parse::<u64>())
            .transpose()
            .map_err(|_| ApiError::validation("original_size must be a non-negative integer"))?;

        let lifetime = match self.expires_in_seconds {
            Some(raw) => match raw.parse::<i64>() {
                Ok(secs) if secs > 0 => Duration::try_seconds(secs)
                    .ok_or_else(|| ApiError::validation("expires_in_seconds is out of range"))?,
                _ => {
                    return Err(ApiError::validation(
                        "expires_in_seconds must be a positive integer",
                    ))
                }
            },
            None => default_expiry,
        };

        let expiry_time = Utc::now()
            .checked_add_signed(lifetime)
            .ok_or_else(|| ApiError::validation("expires_in_seconds is out of range"))?;

        let original_filename = self
            .original_name
            .or(self.file_name)
            .unwrap_or_else(|| "file".to_string());

        Ok((
            ciphertext,
            NewFile {
                original_filename,
                sender_email,
                recipient_email,
                iv,
                mime_type: self.mime_type.unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
                original_size,
                expiry_time,
            },
        ))
    }
}

fn required_email(value: Option<String>, field: &str) -> Result<String, ApiError> {
    let email =
        value.ok_or_else(|| ApiError::validation(format!("Missing required field: {field}")))?;
    if !is_valid_email(&email) {
        return Err(ApiError::validation(format!("{field} is not a valid email address")));
    }
    Ok(normalize_email(&email))
}

/// Store an uploaded ciphertext with its metadata.
///
/// Multipart fields: `file`, `sender_email`, `recipient_email`,
/// `original_name`, `mime_type`, `iv_b64`, and optionally `original_size`
/// and `expires_in_seconds`.
#[utoipa::path(
    post,
    path = "/api/files",
    tag = "Files",
    request_body(content_type = "multipart/form-data", description = "Ciphertext and metadata"),
    responses(
        (status = 201, description = "File stored", body = UploadResponse),
        (status = 400, description = "Missing or invalid field")
    )
)]
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let form = UploadForm::read(multipart).await?;
    let (ciphertext, new_file) = form.into_new_file(state.config.file_expiry)?;

    let record = FileRepository::new(state.storage()).put(&ciphertext, new_file)?;

    tracing::info!(
        file_id = %record.file_id,
        size = record.size,
        expiry_time = %record.expiry_time,
        "Stored shared file"
    );
    AuditRepository::new(state.storage()).record_file_event(
        &FileAuditEvent::new(FileAction::Upload, &record.file_id)
            .with_actor(Some(&record.sender_email))
            .with_details(format!("{} -> {}", record.sender_email, record.recipient_email)),
    );

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "File uploaded".to_string(),
            file: record,
        }),
    ))
}

/// List file metadata by sender or recipient, newest first.
///
/// Expired and revoked files are included; the access predicate only
/// applies to downloads.
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "Files",
    params(FileListQuery),
    responses(
        (status = 200, description = "Matching files", body = FileListResponse)
    )
)]
pub async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<FileListQuery>,
) -> Result<Json<FileListResponse>, ApiError> {
    let repo = FileRepository::new(state.storage());
    let sender = query.sender.filter(|s| !s.trim().is_empty());
    let recipient = query.recipient.filter(|s| !s.trim().is_empty());

    let files = match (sender, recipient) {
        (Some(sender), Some(recipient)) => repo
            .list_by_sender(&sender)?
            .into_iter()
            .filter(|f| same_email(&f.recipient_email, &recipient))
            .collect(),
        (Some(sender), None) => repo.list_by_sender(&sender)?,
        (None, Some(recipient)) => repo.list_by_recipient(&recipient)?,
        (None, None) => repo.list_all()?,
    };

    Ok(Json(FileListResponse {
        total: files.len(),
        files,
    }))
}

/// Metadata of one file, without ciphertext.
#[utoipa::path(
    get,
    path = "/api/files/{file_id}",
    tag = "Files",
    params(("file_id" = String, Path, description = "File ID")),
    responses(
        (status = 200, description = "File metadata", body = FileRecord),
        (status = 404, description = "Unknown file")
    )
)]
pub async fn get_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Json<FileRecord>, ApiError> {
    let record = FileRepository::new(state.storage()).get_meta(&file_id)?;
    Ok(Json(record))
}

/// Ciphertext of a file that is neither revoked nor expired.
///
/// The body is `ciphertext || tag`, unchanged from upload. The IV and the
/// plaintext MIME type are returned as headers.
#[utoipa::path(
    get,
    path = "/api/files/{file_id}/download",
    tag = "Files",
    params(
        ("file_id" = String, Path, description = "File ID"),
        ActorQuery
    ),
    responses(
        (status = 200, description = "Ciphertext", content_type = "application/octet-stream"),
        (status = 404, description = "Unknown file"),
        (status = 410, description = "File revoked or expired")
    )
)]
pub async fn download_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    Query(actor): Query<ActorQuery>,
) -> Result<Response, ApiError> {
    let audit = AuditRepository::new(state.storage());
    let result = FileRepository::new(state.storage()).download(&file_id, Utc::now());

    let (ciphertext, record) = match result {
        Ok(found) => found,
        Err(e) => {
            let reason = match &e {
                FileAccessError::NotFound(_) => "not found",
                FileAccessError::Revoked(_) => "revoked",
                FileAccessError::Expired(_) => "expired",
                FileAccessError::Storage(_) => "storage failure",
            };
            tracing::info!(file_id = %file_id, reason, "Download denied");
            audit.record_file_event(
                &FileAuditEvent::new(FileAction::Download, &file_id)
                    .with_actor(actor.by.as_deref())
                    .failed(reason),
            );
            return Err(e.into());
        }
    };

    audit.record_file_event(
        &FileAuditEvent::new(FileAction::Download, &record.file_id)
            .with_actor(actor.by.as_deref())
            .with_details(format!("{} bytes", record.size)),
    );

    let iv = HeaderValue::from_str(&record.iv)
        .map_err(|_| ApiError::internal("Stored IV is not a valid header value"))?;
    let mime = HeaderValue::from_str(&record.mime_type)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_MIME_TYPE));
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        record.encrypted_filename
    ))
    .map_err(|_| ApiError::internal("Stored file name is not a valid header value"))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(DEFAULT_MIME_TYPE)),
            (header::CONTENT_DISPOSITION, disposition),
            (HeaderName::from_static(IV_HEADER), iv),
            (HeaderName::from_static(MIME_TYPE_HEADER), mime),
        ],
        ciphertext,
    )
        .into_response())
}

/// Revoke a file. Revoking twice succeeds both times.
#[utoipa::path(
    post,
    path = "/api/files/{file_id}/revoke",
    tag = "Files",
    params(
        ("file_id" = String, Path, description = "File ID"),
        ActorQuery
    ),
    responses(
        (status = 200, description = "File revoked", body = RevokeFileResponse),
        (status = 404, description = "Unknown file")
    )
)]
pub async fn revoke_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    Query(actor): Query<ActorQuery>,
) -> Result<Json<RevokeFileResponse>, ApiError> {
    let revocation = FileRepository::new(state.storage()).revoke(&file_id, actor.by.as_deref())?;

    let message = if revocation.already_revoked {
        "Already revoked"
    } else {
        tracing::info!(file_id = %file_id, "Revoked shared file");
        AuditRepository::new(state.storage()).record_file_event(
            &FileAuditEvent::new(FileAction::Revoke, &file_id).with_actor(actor.by.as_deref()),
        );
        "File revoked"
    };

    Ok(Json(RevokeFileResponse {
        message: message.to_string(),
        file: revocation.record,
    }))
}

/// Most recent file lifecycle events, newest first.
#[utoipa::path(
    get,
    path = "/api/logs",
    tag = "Files",
    responses(
        (status = 200, description = "File events", body = FileEventListResponse)
    )
)]
pub async fn list_file_events(
    State(state): State<AppState>,
) -> Result<Json<FileEventListResponse>, ApiError> {
    let events = AuditRepository::new(state.storage()).list_file_events(FILE_EVENT_LIMIT)?;
    Ok(Json(FileEventListResponse {
        total: events.len(),
        events,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::state::test_state;
    use crate::storage::AccessStatus;
    use axum::body::to_bytes;

    fn store(state: &AppState, ciphertext: &[u8], expires_in: Duration) -> FileRecord {
        FileRepository::new(state.storage())
            .put(
                ciphertext,
                NewFile {
                    original_filename: "report.txt".into(),
                    sender_email: "a@bank.com".into(),
                    recipient_email: "v@vendor.com".into(),
                    iv: "AAAAAAAAAAAAAAAA".into(),
                    mime_type: "text/plain".into(),
                    original_size: Some(10),
                    expiry_time: Utc::now() + expires_in,
                },
            )
            .unwrap()
    }

    #[tokio::test]
    async fn download_returns_ciphertext_with_iv_headers() {
        let (state, _temp_dir) = test_state();
        let record = store(&state, b"ciphertext-bytes", Duration::hours(1));

        let response = download_file(
            State(state.clone()),
            Path(record.file_id.clone()),
            Query(ActorQuery::default()),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[IV_HEADER], "AAAAAAAAAAAAAAAA");
        assert_eq!(response.headers()[MIME_TYPE_HEADER], "text/plain");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"ciphertext-bytes");
    }

    #[tokio::test]
    async fn revoke_is_idempotent_and_blocks_download() {
        let (state, _temp_dir) = test_state();
        let record = store(&state, b"ciphertext", Duration::hours(1));

        let Json(first) = revoke_file(
            State(state.clone()),
            Path(record.file_id.clone()),
            Query(ActorQuery {
                by: Some("a@bank.com".into()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(first.message, "File revoked");
        assert!(first.file.revoked);

        let Json(second) = revoke_file(
            State(state.clone()),
            Path(record.file_id.clone()),
            Query(ActorQuery::default()),
        )
        .await
        .unwrap();
        assert_eq!(second.message, "Already revoked");
        assert_eq!(second.file.revoked_by.as_deref(), Some("a@bank.com"));

        let err = download_file(
            State(state.clone()),
            Path(record.file_id.clone()),
            Query(ActorQuery::default()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::GONE);
        assert_eq!(err.kind, ErrorKind::Revoked);
    }

    #[tokio::test]
    async fn expired_file_is_denied_but_still_listed() {
        let (state, _temp_dir) = test_state();
        let record = store(&state, b"ciphertext", Duration::seconds(-1));

        let err = download_file(
            State(state.clone()),
            Path(record.file_id.clone()),
            Query(ActorQuery::default()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Expired);

        let Json(listing) = list_files(
            State(state.clone()),
            Query(FileListQuery {
                sender: Some("A@Bank.com".into()),
                recipient: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(listing.total, 1);
        assert_eq!(listing.files[0].file_id, record.file_id);
    }

    #[tokio::test]
    async fn unknown_file_is_not_found() {
        let (state, _temp_dir) = test_state();
        let err = download_file(
            State(state.clone()),
            Path(uuid::Uuid::new_v4().to_string()),
            Query(ActorQuery::default()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let err = revoke_file(
            State(state),
            Path("../etc/passwd".into()),
            Query(ActorQuery::default()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn denied_and_successful_downloads_are_audited() {
        let (state, _temp_dir) = test_state();
        let record = store(&state, b"ciphertext", Duration::hours(1));

        download_file(
            State(state.clone()),
            Path(record.file_id.clone()),
            Query(ActorQuery {
                by: Some("v@vendor.com".into()),
            }),
        )
        .await
        .unwrap();
        revoke_file(
            State(state.clone()),
            Path(record.file_id.clone()),
            Query(ActorQuery::default()),
        )
        .await
        .unwrap();
        let _ = download_file(
            State(state.clone()),
            Path(record.file_id.clone()),
            Query(ActorQuery::default()),
        )
        .await;

        let Json(log) = list_file_events(State(state)).await.unwrap();
        let downloads: Vec<_> = log
            .events
            .iter()
            .filter(|e| e.action == FileAction::Download)
            .collect();
        assert_eq!(downloads.len(), 2);
        assert!(downloads
            .iter()
            .any(|e| e.status == AccessStatus::Failed && e.details == "revoked"));
        assert!(downloads.iter().any(|e| {
            e.status == AccessStatus::Success && e.actor.as_deref() == Some("v@vendor.com")
        }));
    }

    #[test]
    fn upload_form_requires_fields_and_valid_iv() {
        let form = UploadForm {
            ciphertext: Some(vec![1, 2, 3]),
            sender_email: Some("a@bank.com".into()),
            recipient_email: Some("v@vendor.com".into()),
            iv_b64: Some("not-an-iv".into()),
            ..Default::default()
        };
        let err = form.into_new_file(Duration::minutes(5)).err().unwrap();
        assert_eq!(err.kind, ErrorKind::ValidationError);

        let form = UploadForm {
            ciphertext: Some(vec![1, 2, 3]),
            recipient_email: Some("v@vendor.com".into()),
            iv_b64: Some("AAAAAAAAAAAAAAAA".into()),
            ..Default::default()
        };
        let err = form.into_new_file(Duration::minutes(5)).err().unwrap();
        assert!(err.message.contains("sender_email"));
    }

    #[test]
    fn upload_form_applies_expiry_override() {
        let form = UploadForm {
            ciphertext: Some(vec![1, 2, 3]),
            file_name: Some("blob.bin".into()),
            sender_email: Some(" A@Bank.com ".into()),
            recipient_email: Some("v@vendor.com".into()),
            iv_b64: Some("AAAAAAAAAAAAAAAA".into()),
            expires_in_seconds: Some("3600".into()),
            ..Default::default()
        };
        let (_, new_file) = form.into_new_file(Duration::minutes(5)).unwrap();
        assert_eq!(new_file.sender_email, "a@bank.com");
        assert_eq!(new_file.original_filename, "blob.bin");
        assert_eq!(new_file.mime_type, DEFAULT_MIME_TYPE);
        assert!(new_file.expiry_time > Utc::now() + Duration::minutes(59));

        let form = UploadForm {
            ciphertext: Some(vec![]),
            sender_email: Some("a@bank.com".into()),
            recipient_email: Some("v@vendor.com".into()),
            iv_b64: Some("AAAAAAAAAAAAAAAA".into()),
            expires_in_seconds: Some("0".into()),
            ..Default::default()
        };
        assert!(form.into_new_file(Duration::minutes(5)).is_err());
    }

    #[test]
    fn upload_form_rejects_unrepresentable_expiry() {
        for raw in ["9223372036854775807", "10000000000000"] {
            let form = UploadForm {
                ciphertext: Some(vec![1, 2, 3]),
                sender_email: Some("a@bank.com".into()),
                recipient_email: Some("v@vendor.com".into()),
                iv_b64: Some("AAAAAAAAAAAAAAAA".into()),
                expires_in_seconds: Some(raw.into()),
                ..Default::default()
            };
            let err = form.into_new_file(Duration::minutes(5)).err().unwrap();
            assert_eq!(err.kind, ErrorKind::ValidationError, "{raw}");
            assert!(err.message.contains("out of range"), "{raw}");
        }
    }
}
