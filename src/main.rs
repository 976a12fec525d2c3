// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use ledger_vault::{
    api::router,
    config::{LogFormat, NodeConfig, DEFAULT_LOG_FILTER},
    ledger::{Ledger, LogRetention},
    state::AppState,
};

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
    }
}

async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
            shutdown.cancel();
        }
        _ = shutdown.cancelled() => {}
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = NodeConfig::from_env()?;
    init_tracing(config.log_format);

    std::fs::create_dir_all(&config.data_dir)?;
    let ledger = Arc::new(Ledger::open(&config.ledger_path())?);
    let shutdown = CancellationToken::new();

    let retention = config.log_retention_slots.map(|retain_slots| {
        let task = LogRetention::new(ledger.clone(), retain_slots, config.prune_interval);
        tokio::spawn(task.run(shutdown.clone()))
    });

    let app = router(AppState::new(ledger));
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(
        addr = %config.bind_addr,
        data_dir = %config.data_dir.display(),
        log_retention_slots = ?config.log_retention_slots,
        "Ledger node listening (docs at /docs)"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    if let Some(handle) = retention {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Log retention task ended abnormally");
        }
    }
    tracing::info!("Ledger node stopped");
    Ok(())
}
