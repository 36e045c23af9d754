// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Caller identity for the portal front end.

use axum::{extract::Query, Json};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::{Auth, AuthenticatedUser, Capability, Role};

#[derive(Debug, Deserialize, IntoParams)]
pub struct PageQuery {
    /// Portal page to check, e.g. `/bank-employee/audit`.
    pub page: Option<String>,
}

/// Response for GET /api/me
#[derive(Debug, Serialize, ToSchema)]
pub struct PrincipalResponse {
    pub email: String,
    pub role: Role,
    pub capabilities: Vec<Capability>,
    /// Present when a page was asked about.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_allowed: Option<bool>,
}

impl PrincipalResponse {
    fn new(user: AuthenticatedUser, page: Option<&str>) -> Self {
        Self {
            page_allowed: page.map(|p| user.role.may_access(p)),
            capabilities: user.role.capabilities(),
            email: user.email,
            role: user.role,
        }
    }
}

/// Identity, role and capabilities of the bearer.
///
/// With `?page=`, also reports whether the role may open that portal page.
#[utoipa::path(
    get,
    path = "/api/me",
    tag = "Portal",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Caller identity", body = PrincipalResponse),
        (status = 401, description = "Missing or invalid bearer token")
    )
)]
pub async fn current_principal(
    Auth(user): Auth,
    Query(query): Query<PageQuery>,
) -> Json<PrincipalResponse> {
    Json(PrincipalResponse::new(user, query.page.as_deref()))
}
