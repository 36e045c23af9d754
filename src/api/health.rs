// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Probes for orchestrators and load balancers.
//!
//! `/health/live` never touches the disk. `/health` and `/health/ready`
//! probe the data directory: a write/read/delete round trip on the root and
//! the presence of the blob and audit directories that uploads and the
//! audit trail write into.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStatus {
    Ok,
    Unavailable,
}

impl ComponentStatus {
    fn is_ok(self) -> bool {
        self == ComponentStatus::Ok
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// `ok` when every check passes, else `degraded`.
    pub status: String,
    pub version: String,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Write/read/delete probe on the data directory.
    pub storage: ComponentStatus,
    /// Ciphertext blob directory.
    pub blobs: ComponentStatus,
    /// Audit stream directory.
    pub audit: ComponentStatus,
}

impl HealthChecks {
    fn run(state: &AppState) -> Self {
        let storage = match state.storage().health_check() {
            Ok(()) => ComponentStatus::Ok,
            Err(e) => {
                tracing::warn!(error = %e, "Storage probe failed");
                ComponentStatus::Unavailable
            }
        };
        let dir_status = |dir: std::path::PathBuf, name: &str| {
            if dir.is_dir() {
                ComponentStatus::Ok
            } else {
                tracing::warn!(dir = %dir.display(), component = name, "Directory missing");
                ComponentStatus::Unavailable
            }
        };
        let paths = state.storage().paths();

        Self {
            storage,
            blobs: dir_status(paths.blobs_dir(), "blobs"),
            audit: dir_status(paths.audit_dir(), "audit"),
        }
    }

    fn all_ok(&self) -> bool {
        self.storage.is_ok() && self.blobs.is_ok() && self.audit.is_ok()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

fn report(state: &AppState) -> (StatusCode, Json<ReadyResponse>) {
    let checks = HealthChecks::run(state);
    let (code, status) = if checks.all_ok() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        code,
        Json(ReadyResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            checks,
        }),
    )
}

/// Full component report; 503 when any component is unavailable.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "All components available", body = ReadyResponse),
        (status = 503, description = "At least one component unavailable", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    report(&state)
}

#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Process is up", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Same checks as `/health`; kept separate so probes can be configured
/// independently.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Ready to accept uploads", body = ReadyResponse),
        (status = 503, description = "Data directory unusable", body = ReadyResponse)
    )
)]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    report(&state)
}
