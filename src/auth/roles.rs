// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Portal roles and the capabilities they grant.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Portal roles.
///
/// ## Role Overview
///
/// - `BankEmployee` - Shares files, manages vendors, reviews audit trails
/// - `ThirdPartyVendor` - Opens shared files
/// - `User` - Bank customer, sees their own dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    BankEmployee,
    ThirdPartyVendor,
    User,
}

/// Things a portal principal may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Upload, list and revoke shared files
    ShareFiles,
    /// Approve, reject and remove vendors; list and revoke vendor sessions
    ManageVendors,
    /// Read access logs and the file audit trail
    ReviewAudit,
    /// Open files shared with them
    DecryptFiles,
    ViewOwnDashboard,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::ShareFiles,
        Capability::ManageVendors,
        Capability::ReviewAudit,
        Capability::DecryptFiles,
        Capability::ViewOwnDashboard,
    ];
}

/// Route prefixes gated to a single role.
const ROLE_ROUTES: [(&str, Role); 3] = [
    ("/bank-employee", Role::BankEmployee),
    ("/third-party-vendor", Role::ThirdPartyVendor),
    ("/user", Role::User),
];

impl Role {
    /// The single authorization predicate.
    pub fn can(&self, capability: Capability) -> bool {
        matches!(
            (self, capability),
            (Role::BankEmployee, Capability::ShareFiles)
                | (Role::BankEmployee, Capability::ManageVendors)
                | (Role::BankEmployee, Capability::ReviewAudit)
                | (Role::ThirdPartyVendor, Capability::DecryptFiles)
                | (Role::User, Capability::ViewOwnDashboard)
        )
    }

    /// Every capability this role holds, in declaration order.
    pub fn capabilities(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|cap| self.can(*cap))
            .collect()
    }

    /// Whether this role may open a portal page at `path`.
    ///
    /// Paths outside the gated prefixes are open to every role.
    pub fn may_access(&self, path: &str) -> bool {
        ROLE_ROUTES
            .iter()
            .find(|(prefix, _)| path.starts_with(prefix))
            .is_none_or(|(_, role)| role == self)
    }

    /// Parse role from string (case-insensitive).
    pub fn from_str(s: &str) -> Option<Role> {
        match s.trim().to_lowercase().as_str() {
            "bank_employee" => Some(Role::BankEmployee),
            "third_party_vendor" => Some(Role::ThirdPartyVendor),
            "user" => Some(Role::User),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::BankEmployee => "bank_employee",
            Role::ThirdPartyVendor => "third_party_vendor",
            Role::User => "user",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
