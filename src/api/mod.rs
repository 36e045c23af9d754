// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{Capability, Role},
    error::{ErrorBody, ErrorKind},
    models::{
        AccessLogListResponse, BalanceRequest, BalanceResponse, DeleteVendorRequest,
        FileEventListResponse, FileListResponse, MessageResponse, RegisterVendorRequest,
        RegisterVendorResponse, RevokeFileResponse, RevokeSessionRequest, RevokeSessionResponse,
        SessionListResponse, UploadResponse, VendorRequestListResponse,
        VerifiedVendorListResponse, VerifyVendorRequest, VerifyVendorResponse,
    },
    sessions::ActiveSession,
    state::AppState,
    storage::{
        AccessLogEntry, AccessStatus, FileAction, FileAuditEvent, FileRecord,
        VendorRequestSummary, VerifiedVendorSummary,
    },
};

pub mod audit;
pub mod balance;
pub mod files;
pub mod health;
pub mod portal;
pub mod sessions;
pub mod vendors;

pub fn router(state: AppState) -> Router {
    let file_routes = Router::new()
        .route(
            "/api/files",
            get(files::list_files)
                .post(files::upload_file)
                .layer(DefaultBodyLimit::max(files::MAX_UPLOAD_BYTES)),
        )
        .route("/api/files/{file_id}", get(files::get_file))
        .route("/api/files/{file_id}/download", get(files::download_file))
        .route("/api/files/{file_id}/revoke", post(files::revoke_file))
        .route("/api/logs", get(files::list_file_events));

    let vendor_routes = Router::new()
        .route("/reqverification", post(vendors::request_verification))
        .route("/verifyvendor", post(vendors::verify_vendor))
        .route("/deleterequest", delete(vendors::delete_request))
        .route("/deleteverified", delete(vendors::delete_verified))
        .route("/vendor-requests", get(vendors::list_requests))
        .route("/verified-vendors", get(vendors::list_verified));

    let session_routes = Router::new()
        .route("/get_balance", post(balance::get_balance))
        .route("/sessions", get(sessions::list_sessions))
        .route("/revoke-session", post(sessions::revoke_session))
        .route("/access-logs", get(audit::list_access_logs));

    let portal_routes = Router::new().route("/api/me", get(portal::current_principal));

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    Router::new()
        .merge(file_routes)
        .merge(vendor_routes)
        .merge(session_routes)
        .merge(portal_routes)
        .merge(health_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

/// Registers the portal bearer token scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        files::upload_file,
        files::list_files,
        files::get_file,
        files::download_file,
        files::revoke_file,
        files::list_file_events,
        vendors::request_verification,
        vendors::verify_vendor,
        vendors::delete_request,
        vendors::delete_verified,
        vendors::list_requests,
        vendors::list_verified,
        balance::get_balance,
        sessions::list_sessions,
        sessions::revoke_session,
        audit::list_access_logs,
        portal::current_principal
    ),
    components(
        schemas(
            ErrorBody,
            ErrorKind,
            MessageResponse,
            FileRecord,
            UploadResponse,
            FileListResponse,
            RevokeFileResponse,
            FileAction,
            FileAuditEvent,
            FileEventListResponse,
            RegisterVendorRequest,
            RegisterVendorResponse,
            VerifyVendorRequest,
            VerifyVendorResponse,
            DeleteVendorRequest,
            VendorRequestSummary,
            VerifiedVendorSummary,
            VendorRequestListResponse,
            VerifiedVendorListResponse,
            BalanceRequest,
            BalanceResponse,
            ActiveSession,
            SessionListResponse,
            RevokeSessionRequest,
            RevokeSessionResponse,
            AccessStatus,
            AccessLogEntry,
            AccessLogListResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::ComponentStatus,
            health::HealthResponse,
            portal::PrincipalResponse,
            Role,
            Capability
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Files", description = "Encrypted file upload, download and revocation"),
        (name = "Vendors", description = "Vendor registration and approval"),
        (name = "Facilities", description = "Vendor-mediated bank facilities"),
        (name = "Sessions", description = "Vendor session oversight"),
        (name = "Audit", description = "Access log review"),
        (name = "Portal", description = "Caller identity and page gating")
    )
)]
pub struct ApiDoc;
