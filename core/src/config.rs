//! Configuration Module
//!
//! Turns the TOML/env configuration into live components: the hasher, the
//! ledger client and the sync service settings.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use aion_config::{HashConfig, HashVariantToml, LedgerBackend, LedgerConfig};
use aion_privacy::{PoseidonHasher, SpongeVariant, check_conformance, load_vectors};
use anyhow::{Context, Result, bail};
use log::{info, warn};

use crate::ledger::{InMemoryLedger, LedgerClient, RpcLedger};

pub fn sponge_variant(variant: HashVariantToml) -> SpongeVariant {
    match variant {
        HashVariantToml::OnElements => SpongeVariant::OnElements,
        HashVariantToml::Unpadded => SpongeVariant::Unpadded,
    }
}

pub fn build_hasher(cfg: &HashConfig) -> PoseidonHasher {
    PoseidonHasher::new(sponge_variant(cfg.variant))
}

/// Check the configured hasher against the ledger's known vectors.
///
/// With `require_conformance` a missing or failing vector file is fatal unless
/// `dev_mode` is set, in which case it is only logged.
pub fn verify_hash_conformance(
    hasher: &PoseidonHasher,
    cfg: &HashConfig,
    dev_mode: bool,
) -> Result<()> {
    let enforce = cfg.require_conformance && !dev_mode;

    let Some(path) = &cfg.conformance_vectors else {
        if enforce {
            bail!("hash conformance required but no vector file configured");
        }
        warn!("No hash conformance vectors configured; {} is unchecked", hasher.variant());
        return Ok(());
    };

    let result = fs::read_to_string(path)
        .with_context(|| format!("Failed to read hash vectors: {path}"))
        .and_then(|json| load_vectors(&json).context("Failed to parse hash vectors"))
        .and_then(|vectors| {
            check_conformance(hasher, &vectors)
                .map(|()| vectors.len())
                .context("Hash conformance check failed")
        });

    match result {
        Ok(count) => {
            info!("Hash adapter {} matches {} ledger vectors", hasher.variant(), count);
            Ok(())
        }
        Err(e) if enforce => Err(e),
        Err(e) => {
            warn!("{:#}", e);
            Ok(())
        }
    }
}

pub fn build_ledger(cfg: &LedgerConfig) -> Result<LedgerClient> {
    match cfg.backend {
        LedgerBackend::Memory => Ok(LedgerClient::Memory(Arc::new(InMemoryLedger::new()))),
        LedgerBackend::Rpc => {
            if cfg.auth_token.is_none() {
                warn!("No ledger auth token configured; root writes will be unauthenticated");
            }
            let ledger = RpcLedger::new(
                cfg.rpc_url.clone(),
                cfg.auth_token.clone(),
                Duration::from_secs(cfg.request_timeout_secs),
            )
            .context("Failed to build ledger RPC client")?;
            info!("Ledger JSON-RPC endpoint: {}", ledger.url());
            Ok(LedgerClient::Rpc(ledger))
        }
    }
}
