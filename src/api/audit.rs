// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use crate::{
    auth::BankEmployeeOnly, error::ApiError, models::AccessLogListResponse, state::AppState,
    storage::AuditRepository,
};

/// Every facility invocation, newest first.
#[utoipa::path(
    get,
    path = "/access-logs",
    tag = "Audit",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Access log", body = AccessLogListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Bank employees only")
    )
)]
pub async fn list_access_logs(
    BankEmployeeOnly(_employee): BankEmployeeOnly,
    State(state): State<AppState>,
) -> Result<Json<AccessLogListResponse>, ApiError> {
    let entries = AuditRepository::new(state.storage()).list_access()?;
    Ok(Json(AccessLogListResponse {
        total: entries.len(),
        entries,
    }))
}
