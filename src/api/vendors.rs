// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Vendor registration and approval endpoints.
//!
//! Registration is open to anyone; everything else is reserved for bank
//! employees.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::BankEmployeeOnly,
    error::ApiError,
    models::{
        DeleteVendorRequest, MessageResponse, RegisterVendorRequest, RegisterVendorResponse,
        VendorRequestListResponse, VerifiedVendorListResponse, VerifyVendorRequest,
        VerifyVendorResponse,
    },
    state::AppState,
    vendors::{Promotion, Registration},
};

/// Submit a vendor registration for review.
#[utoipa::path(
    post,
    path = "/reqverification",
    tag = "Vendors",
    request_body = RegisterVendorRequest,
    responses(
        (status = 201, description = "Request recorded", body = RegisterVendorResponse),
        (status = 400, description = "Missing or invalid field"),
        (status = 409, description = "Request pending or vendor already verified")
    )
)]
pub async fn request_verification(
    State(state): State<AppState>,
    body: Result<Json<RegisterVendorRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterVendorResponse>), ApiError> {
    let Json(request) = body?;
    let summary = state.vendors.submit_request(Registration {
        vendor_name: request.vendor_name,
        vendor_email: request.vendor_email,
        vendor_password: request.vendor_password,
        vendor_documentation: request.vendor_documentation,
    })?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterVendorResponse {
            message: "Verification request submitted".to_string(),
            request: summary,
        }),
    ))
}

/// Promote a vendor to verified and issue their vendor token.
#[utoipa::path(
    post,
    path = "/verifyvendor",
    tag = "Vendors",
    security(("bearer_auth" = [])),
    request_body = VerifyVendorRequest,
    responses(
        (status = 201, description = "Vendor verified", body = VerifyVendorResponse),
        (status = 400, description = "Missing field"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Bank employees only"),
        (status = 409, description = "Vendor already verified")
    )
)]
pub async fn verify_vendor(
    BankEmployeeOnly(employee): BankEmployeeOnly,
    State(state): State<AppState>,
    body: Result<Json<VerifyVendorRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<VerifyVendorResponse>), ApiError> {
    let Json(request) = body?;
    let vendor = state.vendors.verify(Promotion {
        vendor_name: request.vendor_name,
        vendor_email: request.vendor_email,
        vendor_password: request.vendor_password,
    })?;

    tracing::info!(
        vendor_id = %vendor.vendor_id,
        verified_by = %employee.email,
        "Vendor promoted"
    );

    Ok((
        StatusCode::CREATED,
        Json(VerifyVendorResponse {
            message: "Vendor verified successfully".to_string(),
            vendor_id: vendor.vendor_id,
            vendor_name: vendor.vendor_name,
            vendor_email: vendor.vendor_email,
            vendor_token: vendor.vendor_token,
            verified_at: vendor.verified_at,
        }),
    ))
}

fn required_email(request: &DeleteVendorRequest) -> Result<&str, ApiError> {
    let email = request.email.trim();
    if email.is_empty() {
        return Err(ApiError::validation("Missing required field: email"));
    }
    Ok(email)
}

/// Reject a pending registration.
#[utoipa::path(
    delete,
    path = "/deleterequest",
    tag = "Vendors",
    security(("bearer_auth" = [])),
    request_body = DeleteVendorRequest,
    responses(
        (status = 200, description = "Request deleted", body = MessageResponse),
        (status = 404, description = "No pending request for this email")
    )
)]
pub async fn delete_request(
    BankEmployeeOnly(_employee): BankEmployeeOnly,
    State(state): State<AppState>,
    body: Result<Json<DeleteVendorRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) = body?;
    state.vendors.reject(required_email(&request)?)?;
    Ok(Json(MessageResponse::new("Vendor request deleted")))
}

/// Remove a verified vendor. Their token stops working immediately.
#[utoipa::path(
    delete,
    path = "/deleteverified",
    tag = "Vendors",
    security(("bearer_auth" = [])),
    request_body = DeleteVendorRequest,
    responses(
        (status = 200, description = "Vendor deleted", body = MessageResponse),
        (status = 404, description = "No verified vendor for this email")
    )
)]
pub async fn delete_verified(
    BankEmployeeOnly(_employee): BankEmployeeOnly,
    State(state): State<AppState>,
    body: Result<Json<DeleteVendorRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) = body?;
    state.vendors.remove_verified(required_email(&request)?)?;
    Ok(Json(MessageResponse::new("Verified vendor deleted")))
}

/// Pending registrations.
#[utoipa::path(
    get,
    path = "/vendor-requests",
    tag = "Vendors",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Pending requests", body = VendorRequestListResponse)
    )
)]
pub async fn list_requests(
    BankEmployeeOnly(_employee): BankEmployeeOnly,
    State(state): State<AppState>,
) -> Result<Json<VendorRequestListResponse>, ApiError> {
    let requests = state.vendors.list_requests()?;
    Ok(Json(VendorRequestListResponse {
        total: requests.len(),
        requests,
    }))
}

/// Verified vendors, without their tokens.
#[utoipa::path(
    get,
    path = "/verified-vendors",
    tag = "Vendors",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Verified vendors", body = VerifiedVendorListResponse)
    )
)]
pub async fn list_verified(
    BankEmployeeOnly(_employee): BankEmployeeOnly,
    State(state): State<AppState>,
) -> Result<Json<VerifiedVendorListResponse>, ApiError> {
    let vendors = state.vendors.list_verified()?;
    Ok(Json(VerifiedVendorListResponse {
        total: vendors.len(),
        vendors,
    }))
}
