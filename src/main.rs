// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;

use axum_server::tls_rustls::RustlsConfig;
use sharden_server::{
    api::router,
    config::AppConfig,
    state::AppState,
    storage::{AccountRepository, FsStorage, StoragePaths},
    telemetry::{self, LogFormat},
};

#[tokio::main]
async fn main() {
    telemetry::init(LogFormat::from_env());

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    tracing::info!(?config, "Loaded configuration");

    let mut storage = FsStorage::new(StoragePaths::new(&config.data_dir));
    storage.initialize()?;

    if let Some(path) = &config.seed_accounts_path {
        let seeded = AccountRepository::new(&storage).seed_from_file(path)?;
        tracing::info!(seeded, path = %path.display(), "Seeded bank accounts");
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let tls = config.tls.clone();
    let app = router(AppState::new(storage, config));

    match tls {
        Some(paths) => {
            // Install the ring crypto provider for rustls (must be done before any TLS operations)
            rustls::crypto::ring::default_provider()
                .install_default()
                .map_err(|_| "Failed to install rustls crypto provider")?;

            let tls_config = RustlsConfig::from_pem_file(&paths.cert, &paths.key).await?;
            tracing::info!(%addr, "Sharden server listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            tracing::warn!(%addr, "TLS not configured; serving plain HTTP (docs at /docs)");
            axum_server::bind(addr)
                .serve(app.into_make_service())
                .await?;
        }
    }

    Ok(())
}
