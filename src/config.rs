// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup and shared
//! through [`crate::state::AppState`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Root directory for metadata, ciphertext and audit logs | `./data` |
//! | `FILE_EXPIRY_MINUTES` | Default lifetime of an uploaded file | `5` |
//! | `SESSION_TTL_HOURS` | Lifetime of a vendor session | `24` |
//! | `SESSION_TOKEN_SECRET` | HS256 secret for vendor session tokens | random per process |
//! | `VENDOR_TOKEN_SECRET` | HS256 secret for issued vendor tokens | random per process |
//! | `PORTAL_JWT_SECRET` | HS256 secret for portal bearer tokens | random per process |
//! | `VENDOR_PORTAL_BASE` | Base URL embedded in share links | `http://localhost:3000/third-party-vendor` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files enabling HTTPS | unset |
//! | `SEED_ACCOUNTS_PATH` | JSON file of bank accounts to seed | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::path::PathBuf;

use chrono::Duration;
use ring::rand::{SecureRandom, SystemRandom};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const FILE_EXPIRY_MINUTES_ENV: &str = "FILE_EXPIRY_MINUTES";
pub const SESSION_TTL_HOURS_ENV: &str = "SESSION_TTL_HOURS";
pub const SESSION_TOKEN_SECRET_ENV: &str = "SESSION_TOKEN_SECRET";
pub const VENDOR_TOKEN_SECRET_ENV: &str = "VENDOR_TOKEN_SECRET";
pub const PORTAL_JWT_SECRET_ENV: &str = "PORTAL_JWT_SECRET";
pub const VENDOR_PORTAL_BASE_ENV: &str = "VENDOR_PORTAL_BASE";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const SEED_ACCOUNTS_PATH_ENV: &str = "SEED_ACCOUNTS_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_FILE_EXPIRY_MINUTES: i64 = 5;
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;
pub const DEFAULT_VENDOR_PORTAL_BASE: &str = "http://localhost:3000/third-party-vendor";

/// Runtime configuration resolved from the environment.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Lifetime applied to uploads that do not request their own.
    pub file_expiry: Duration,
    /// Lifetime of a freshly created vendor session.
    pub session_ttl: Duration,
    pub session_token_secret: Vec<u8>,
    pub vendor_token_secret: Vec<u8>,
    pub portal_jwt_secret: Vec<u8>,
    pub vendor_portal_base: String,
    pub tls: Option<TlsPaths>,
    pub seed_accounts_path: Option<PathBuf>,
}

/// Errors raised while resolving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("system randomness unavailable while generating {0}")]
    RandomnessUnavailable(&'static str),
}

/// PEM certificate chain and private key used to serve HTTPS.
#[derive(Debug, Clone)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Secrets are intentionally omitted.
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("data_dir", &self.data_dir)
            .field("file_expiry", &self.file_expiry)
            .field("session_ttl", &self.session_ttl)
            .field("vendor_portal_base", &self.vendor_portal_base)
            .field("tls", &self.tls)
            .field("seed_accounts_path", &self.seed_accounts_path)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset secrets are replaced by random per-process values; tokens
    /// signed with them stop verifying after a restart.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = env::var(PORT_ENV)
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let tls = match (env::var(TLS_CERT_PATH_ENV), env::var(TLS_KEY_PATH_ENV)) {
            (Ok(cert), Ok(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            _ => None,
        };

        Ok(Self {
            host: env::var(HOST_ENV).unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            data_dir: env::var(DATA_DIR_ENV)
                .unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string())
                .into(),
            file_expiry: Duration::minutes(positive_env(
                FILE_EXPIRY_MINUTES_ENV,
                DEFAULT_FILE_EXPIRY_MINUTES,
            )),
            session_ttl: Duration::hours(positive_env(
                SESSION_TTL_HOURS_ENV,
                DEFAULT_SESSION_TTL_HOURS,
            )),
            session_token_secret: secret_env(SESSION_TOKEN_SECRET_ENV)?,
            vendor_token_secret: secret_env(VENDOR_TOKEN_SECRET_ENV)?,
            portal_jwt_secret: secret_env(PORTAL_JWT_SECRET_ENV)?,
            vendor_portal_base: env::var(VENDOR_PORTAL_BASE_ENV)
                .unwrap_or_else(|_| DEFAULT_VENDOR_PORTAL_BASE.to_string()),
            tls,
            seed_accounts_path: env::var(SEED_ACCOUNTS_PATH_ENV).ok().map(PathBuf::from),
        })
    }

    /// Fixed configuration rooted at `data_dir`, used by tests and tooling.
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            data_dir: data_dir.into(),
            file_expiry: Duration::minutes(DEFAULT_FILE_EXPIRY_MINUTES),
            session_ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
            session_token_secret: b"session-secret-for-tests".to_vec(),
            vendor_token_secret: b"vendor-secret-for-tests".to_vec(),
            portal_jwt_secret: b"portal-secret-for-tests".to_vec(),
            vendor_portal_base: DEFAULT_VENDOR_PORTAL_BASE.to_string(),
            tls: None,
            seed_accounts_path: None,
        }
    }
}

fn positive_env(name: &str, default: i64) -> i64 {
    match env::var(name).ok().map(|v| v.parse::<i64>()) {
        Some(Ok(v)) if v > 0 => v,
        Some(_) => {
            tracing::warn!(variable = name, default, "Ignoring invalid value, using default");
            default
        }
        None => default,
    }
}

fn secret_env(name: &'static str) -> Result<Vec<u8>, ConfigError> {
    if let Ok(secret) = env::var(name) {
        if !secret.is_empty() {
            return Ok(secret.into_bytes());
        }
    }

    tracing::warn!(
        variable = name,
        "Secret not configured; generating an ephemeral one for this process"
    );
    let mut secret = vec![0u8; 32];
    SystemRandom::new()
        .fill(&mut secret)
        .map_err(|_| ConfigError::RandomnessUnavailable(name))?;
    Ok(secret)
}
