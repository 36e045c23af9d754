// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::crypto::CryptoError;
use crate::sessions::SessionError;
use crate::storage::{FileAccessError, StorageError};
use crate::vendors::VendorError;

/// Stable, machine-readable error category returned with every failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Expired,
    Revoked,
    Unauthorized,
    Forbidden,
    AuthenticationFailed,
    ValidationError,
    Conflict,
    BadRequest,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Expired => "expired",
            ErrorKind::Revoked => "revoked",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::AuthenticationFailed => "authentication_failed",
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::Conflict => "conflict",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: ErrorKind,
    pub message: String,
}

/// JSON body of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    pub kind: ErrorKind,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ErrorKind::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorKind::BadRequest, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorKind::ValidationError, message)
    }

    /// Credentials were not supplied at all.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, ErrorKind::Unauthorized, message)
    }

    /// Credentials were supplied but do not match.
    pub fn credentials_rejected(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, ErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, ErrorKind::Forbidden, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, ErrorKind::Conflict, message)
    }

    pub fn expired(message: impl Into<String>) -> Self {
        Self::new(StatusCode::GONE, ErrorKind::Expired, message)
    }

    pub fn revoked(message: impl Into<String>) -> Self {
        Self::new(StatusCode::GONE, ErrorKind::Revoked, message)
    }

    pub fn authentication_failed(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::AuthenticationFailed,
            message,
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Internal, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(kind = %self.kind, "{}", self.message);
        }
        let body = Json(ErrorBody {
            error: self.message,
            kind: self.kind,
        });
        (self.status, body).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::bad_request(e.body_text())
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(what) => ApiError::not_found(format!("Not found: {what}")),
            StorageError::AlreadyExists(what) => {
                ApiError::conflict(format!("Already exists: {what}"))
            }
            other => ApiError::internal(format!("Storage failure: {other}")),
        }
    }
}

impl From<FileAccessError> for ApiError {
    fn from(e: FileAccessError) -> Self {
        match e {
            FileAccessError::NotFound(_) => ApiError::not_found(e.to_string()),
            FileAccessError::Revoked(_) => ApiError::revoked("Access denied: file revoked"),
            FileAccessError::Expired(_) => ApiError::expired("Access denied: file expired"),
            FileAccessError::Storage(inner) => inner.into(),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Unauthorized => {
                ApiError::credentials_rejected("Invalid or unverified vendor")
            }
            SessionError::NotFound(_) => ApiError::not_found(e.to_string()),
            SessionError::Token(_) => ApiError::internal(e.to_string()),
            SessionError::Storage(inner) => inner.into(),
        }
    }
}

impl From<VendorError> for ApiError {
    fn from(e: VendorError) -> Self {
        match e {
            VendorError::Validation(msg) => ApiError::validation(msg),
            VendorError::Conflict(msg) => ApiError::conflict(msg),
            VendorError::NotFound(_) => ApiError::not_found(e.to_string()),
            VendorError::Credential(_) | VendorError::Token(_) => ApiError::internal(e.to_string()),
            VendorError::Storage(inner) => inner.into(),
        }
    }
}

impl From<CryptoError> for ApiError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::AuthenticationFailed => {
                ApiError::authentication_failed("Ciphertext is corrupted or the key is wrong")
            }
            CryptoError::InvalidKey | CryptoError::InvalidIv => {
                ApiError::bad_request(e.to_string())
            }
            CryptoError::Unavailable => ApiError::internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_kind() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.kind, ErrorKind::NotFound);
        assert_eq!(nf.message, "missing");

        let revoked = ApiError::revoked("gone");
        assert_eq!(revoked.status, StatusCode::GONE);
        assert_eq!(revoked.kind, ErrorKind::Revoked);

        let missing = ApiError::unauthorized("no token");
        assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
        let rejected = ApiError::credentials_rejected("bad token");
        assert_eq!(rejected.status, StatusCode::FORBIDDEN);
        assert_eq!(rejected.kind, ErrorKind::Unauthorized);
    }

    #[test]
    fn file_access_errors_stay_distinct() {
        let expired: ApiError = FileAccessError::Expired("f1".into()).into();
        let revoked: ApiError = FileAccessError::Revoked("f1".into()).into();
        let missing: ApiError = FileAccessError::NotFound("f1".into()).into();
        assert_eq!(expired.kind, ErrorKind::Expired);
        assert_eq!(revoked.kind, ErrorKind::Revoked);
        assert_eq!(missing.kind, ErrorKind::NotFound);
    }

    #[test]
    fn crypto_failure_is_not_a_transport_error() {
        let err: ApiError = CryptoError::AuthenticationFailed.into();
        assert_eq!(err.kind, ErrorKind::AuthenticationFailed);
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::validation("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data","kind":"validation_error"}"#);
    }
}
