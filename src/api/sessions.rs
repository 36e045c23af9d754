// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Vendor session oversight for bank employees.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::Utc;

use crate::{
    auth::BankEmployeeOnly,
    error::ApiError,
    models::{RevokeSessionRequest, RevokeSessionResponse, SessionListResponse},
    state::AppState,
};

/// Active, unexpired sessions with their user and vendor.
#[utoipa::path(
    get,
    path = "/sessions",
    tag = "Sessions",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Usable sessions, newest first", body = SessionListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Bank employees only")
    )
)]
pub async fn list_sessions(
    BankEmployeeOnly(_employee): BankEmployeeOnly,
    State(state): State<AppState>,
) -> Result<Json<SessionListResponse>, ApiError> {
    let sessions = state.sessions.list_active(Utc::now())?;
    Ok(Json(SessionListResponse {
        total: sessions.len(),
        sessions,
    }))
}

/// Revoke an active session.
///
/// Revoking an unknown or already revoked session is a 404.
#[utoipa::path(
    post,
    path = "/revoke-session",
    tag = "Sessions",
    security(("bearer_auth" = [])),
    request_body = RevokeSessionRequest,
    responses(
        (status = 200, description = "Session revoked", body = RevokeSessionResponse),
        (status = 400, description = "Missing sessionId"),
        (status = 404, description = "No active session with this id")
    )
)]
pub async fn revoke_session(
    BankEmployeeOnly(employee): BankEmployeeOnly,
    State(state): State<AppState>,
    body: Result<Json<RevokeSessionRequest>, JsonRejection>,
) -> Result<Json<RevokeSessionResponse>, ApiError> {
    let Json(request) = body?;
    let session_id = request.session_id.trim();
    if session_id.is_empty() {
        return Err(ApiError::validation("Missing required field: sessionId"));
    }
    let revoked_by = request
        .revoked_by
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or(employee.email);

    let session = state.sessions.revoke(session_id, &revoked_by)?;

    Ok(Json(RevokeSessionResponse {
        message: "Session revoked successfully".to_string(),
        session_id: session.session_id,
        revoked_by,
        revoked_at: session.revoked_at.unwrap_or_else(Utc::now),
    }))
}
