//! AION Service
//!
//! Main entry point: loads configuration, checks the hash adapter, connects
//! the ledger, starts the sync worker and serves the HTTP API.

use std::sync::Arc;
use std::time::Instant;

use aion_config::AionConfig;
use aion_core::api::{ApiState, create_router};
use aion_core::config::{build_hasher, build_ledger, verify_hash_conformance};
use aion_core::storage::{NoteStore, RocksNoteStore};
use aion_core::sync::{RootSynchronizer, SyncService, SyncServiceConfig};
use aion_privacy::NoteEngine;
use anyhow::{Context, Result};
use log::info;
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; `log` records from the library modules are bridged in
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aion_core=info,tower_http=info".into()),
        )
        .init();

    // Load configuration
    let _ = AionConfig::set_global(AionConfig::load()?);
    let config = AionConfig::global();

    info!("============================================");
    info!("          AION SERVICE v{}             ", env!("CARGO_PKG_VERSION"));
    info!("============================================");
    info!("API               : {}", config.api.bind_addr());
    info!("DB path           : {}", config.database.path);
    info!("Ledger backend    : {:?}", config.ledger.backend);
    info!("Hash variant      : {:?}", config.hash.variant);
    info!("Consistency       : {:?}", config.sync.consistency);
    info!("Sync interval     : {:?}", config.sync.interval_secs);
    info!("Dev mode          : {}", config.features.dev_mode);
    info!("============================================");

    // Hash adapter, checked before any root is trusted
    let hasher = build_hasher(&config.hash);
    verify_hash_conformance(&hasher, &config.hash, config.features.dev_mode)?;

    // Ledger
    let ledger = Arc::new(build_ledger(&config.ledger)?);
    info!("Ledger client ready ({})", ledger.backend_name());

    // Note store
    let store: Arc<dyn NoteStore> = Arc::new(
        RocksNoteStore::open(&config.database.path)
            .with_context(|| format!("failed to open note store at {}", config.database.path))?,
    );
    info!("Note store opened at {}", config.database.path);

    // Sync service
    let synchronizer = RootSynchronizer::new(hasher.clone());
    let sync_service = Arc::new(SyncService::start(
        synchronizer.clone(),
        ledger.clone(),
        SyncServiceConfig::from(&config.sync),
    ));
    info!("Sync service started");

    let api_state = ApiState {
        notes: Arc::new(NoteEngine::new(hasher)),
        synchronizer: Arc::new(synchronizer),
        ledger,
        store,
        sync_service: sync_service.clone(),
        dev_mode: config.features.dev_mode,
        start_time: Instant::now(),
    };

    let router = create_router(api_state);
    let listener = TcpListener::bind(config.api.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.api.bind_addr()))?;
    info!("HTTP API listening on {}", config.api.bind_addr());

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    info!("Shutting down sync service...");
    if let Err(e) = sync_service.shutdown().await {
        log::error!("Error shutting down sync service: {}", e);
    }

    info!("AION service stopped");
    Ok(())
}
