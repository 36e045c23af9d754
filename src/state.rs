// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::config::AppConfig;
use crate::sessions::VendorSessionManager;
use crate::storage::FsStorage;
use crate::vendors::VendorRegistry;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub storage: FsStorage,
    pub config: Arc<AppConfig>,
    pub sessions: Arc<VendorSessionManager>,
    pub vendors: Arc<VendorRegistry>,
}

impl AppState {
    /// Build the state over an initialized storage root.
    pub fn new(storage: FsStorage, config: AppConfig) -> Self {
        let sessions = VendorSessionManager::new(
            storage.clone(),
            config.session_token_secret.clone(),
            config.session_ttl,
        );
        let vendors = VendorRegistry::new(storage.clone(), config.vendor_token_secret.clone());

        Self {
            storage,
            config: Arc::new(config),
            sessions: Arc::new(sessions),
            vendors: Arc::new(vendors),
        }
    }

    pub fn storage(&self) -> &FsStorage {
        &self.storage
    }
}

/// State over a fresh temporary data directory. The directory lives as long
/// as the returned guard.
#[cfg(test)]
pub fn test_state() -> (AppState, tempfile::TempDir) {
    use crate::storage::StoragePaths;

    let temp_dir = tempfile::TempDir::new().unwrap();
    let config = AppConfig::for_data_dir(temp_dir.path());
    let mut storage = FsStorage::new(StoragePaths::new(temp_dir.path()));
    storage.initialize().unwrap();
    (AppState::new(storage, config), temp_dir)
}

/// Bearer header value for a portal principal signed with the test secret.
#[cfg(test)]
pub fn bearer_for(state: &AppState, email: &str, role: crate::auth::Role) -> String {
    let token = crate::auth::tokens::issue_portal_token(
        &state.config.portal_jwt_secret,
        email,
        role,
        chrono::Duration::hours(1),
    )
    .unwrap();
    format!("Bearer {token}")
}
