// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Balance lookup facility for verified vendors.
//!
//! The vendor is authenticated first (`vendor-token` header plus the vendor
//! email from the body or the `vendor-email` header), then the end user's
//! credentials are checked, then a session for the (user, vendor) pair is
//! found or created.
//!
//! Every attempt appends exactly one access log entry, whatever the outcome.
//! Attempts that fail before a session exists are logged under the
//! `"unauthenticated"` session sentinel.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};

use crate::{
    auth::VendorCredentials,
    crypto::verify_password,
    error::ApiError,
    models::{BalanceRequest, BalanceResponse},
    state::AppState,
    storage::{
        AccessLogEntry, AccountRepository, AuditRepository, StorageError, UNAUTHENTICATED_SESSION,
    },
};

/// Facility name recorded in the access log.
pub const BALANCE_FACILITY: &str = "balance_check";

/// What is known about the caller so far; becomes the access log entry.
struct Attempt {
    session_id: String,
    user_email: String,
    vendor_name: String,
}

impl Attempt {
    fn entry(&self) -> AccessLogEntry {
        AccessLogEntry::new(
            &self.session_id,
            &self.user_email,
            &self.vendor_name,
            BALANCE_FACILITY,
        )
    }
}

/// Look up an end user's balance on behalf of a verified vendor.
#[utoipa::path(
    post,
    path = "/get_balance",
    tag = "Facilities",
    request_body = BalanceRequest,
    params(
        ("vendor-token" = String, Header, description = "Issued vendor token"),
        ("vendor-email" = Option<String>, Header, description = "Vendor email when not in the body")
    ),
    responses(
        (status = 200, description = "Balance and session", body = BalanceResponse),
        (status = 400, description = "Missing field"),
        (status = 401, description = "Missing vendor credentials or invalid user credentials"),
        (status = 403, description = "Invalid or unverified vendor")
    )
)]
pub async fn get_balance(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<BalanceRequest>, JsonRejection>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let mut attempt = Attempt {
        session_id: UNAUTHENTICATED_SESSION.to_string(),
        user_email: String::new(),
        vendor_name: String::new(),
    };

    let result = check_balance(&state, &headers, body, &mut attempt);

    let audit = AuditRepository::new(state.storage());
    match &result {
        Ok(_) => audit.record_access(&attempt.entry()),
        Err(e) => {
            tracing::info!(
                kind = %e.kind,
                session_id = %attempt.session_id,
                "Balance check rejected"
            );
            audit.record_access(&attempt.entry().failed(&e.message));
        }
    }

    result.map(Json)
}

fn check_balance(
    state: &AppState,
    headers: &HeaderMap,
    body: Result<Json<BalanceRequest>, JsonRejection>,
    attempt: &mut Attempt,
) -> Result<BalanceResponse, ApiError> {
    let Json(request) = body?;
    attempt.user_email = request.email.trim().to_string();

    let credentials = VendorCredentials::from_headers(headers, request.vendor_email.as_deref())?;
    attempt.vendor_name = credentials.email.clone();

    let vendor = state
        .sessions
        .authenticate_vendor(&credentials.token, &credentials.email)?;
    attempt.vendor_name = vendor.vendor_name.clone();

    let missing: Vec<&str> = [
        ("email", &request.email),
        ("password", &request.password),
        ("accountNumber", &request.account_number),
    ]
    .iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| *name)
    .collect();
    if !missing.is_empty() {
        return Err(ApiError::validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    let account = match AccountRepository::new(state.storage()).get_by_email(&request.email) {
        Ok(account) => account,
        Err(StorageError::NotFound(_)) => {
            return Err(ApiError::unauthorized("Invalid user credentials"))
        }
        Err(e) => return Err(e.into()),
    };
    if account.account_number != request.account_number.trim()
        || !verify_password(&request.password, &account.password_hash)
    {
        return Err(ApiError::unauthorized("Invalid user credentials"));
    }

    let grant = state
        .sessions
        .get_or_create_session(&account.user_id, &vendor.vendor_id)?;
    attempt.session_id = grant.session.session_id.clone();

    Ok(BalanceResponse {
        balance: account.formatted_balance(),
        currency: account.currency,
        account_number: account.account_number,
        session_id: grant.session.session_id,
        session_token: grant.session.session_token,
        expires_at: grant.session.expires_at,
    })
}
