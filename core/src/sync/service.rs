//! Sync Service
//!
//! Single-writer queue in front of the root synchronizer. One worker task owns
//! the synchronizer and the ledger handle; everything else sends commands.
//!
//! ```text
//!  deposit ──trigger()──┐
//!  api ─────sync_now()──┼──► mpsc ──► worker ──► synchronize(ledger)
//!  timer ───────────────┘             │
//!                                     └── drains queued requests first, so a
//!                                         burst is served by a single pass
//! ```
//!
//! Passes never overlap, so two writers can never race on the root register.

use std::future;
use std::sync::Arc;
use std::time::Duration;

use aion_config::{ConsistencyMode, SyncConfig};
use aion_privacy::FieldHasher;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::SyncError;
use super::synchronizer::{RootSynchronizer, SyncOutcome};
use crate::ledger::Ledger;

type SyncReply = oneshot::Sender<Result<SyncOutcome, SyncError>>;

/// Commands for the sync service
pub enum SyncCommand {
    /// Request a pass, nobody waits for it
    Trigger,
    /// Request a pass and receive its outcome
    SyncNow(SyncReply),
    /// Get service statistics
    Stats(oneshot::Sender<SyncStats>),
    /// Shutdown
    Shutdown,
}

/// Sync service configuration
#[derive(Debug, Clone)]
pub struct SyncServiceConfig {
    pub queue_capacity: usize,
    /// Periodic pass interval
    pub interval: Option<Duration>,
    pub consistency: ConsistencyMode,
}

impl Default for SyncServiceConfig {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for SyncServiceConfig {
    fn from(cfg: &SyncConfig) -> Self {
        Self {
            queue_capacity: cfg.queue_capacity.max(1),
            interval: cfg
                .interval_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            consistency: cfg.consistency,
        }
    }
}

/// Sync service statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    pub passes: u64,
    pub updates: u64,
    pub failures: u64,
    /// Requests served by a pass that was already scheduled
    pub coalesced: u64,
    pub last_outcome: Option<SyncOutcome>,
    pub last_error: Option<String>,
    /// Unix millis of the last completed pass
    pub last_pass_at: Option<i64>,
}

impl SyncStats {
    fn record(&mut self, result: &Result<SyncOutcome, SyncError>) {
        self.passes += 1;
        self.last_pass_at = Some(chrono::Utc::now().timestamp_millis());
        match result {
            Ok(outcome) => {
                if outcome.is_update() {
                    self.updates += 1;
                }
                self.last_outcome = Some(outcome.clone());
                self.last_error = None;
            }
            Err(e) => {
                self.failures += 1;
                self.last_error = Some(e.to_string());
            }
        }
    }
}

/// Handle to the single sync worker
pub struct SyncService {
    command_tx: mpsc::Sender<SyncCommand>,
    consistency: ConsistencyMode,
}

impl SyncService {
    /// Start the sync service
    pub fn start<L, H>(
        synchronizer: RootSynchronizer<H>,
        ledger: Arc<L>,
        config: SyncServiceConfig,
    ) -> Self
    where
        L: Ledger + 'static,
        H: FieldHasher + 'static,
    {
        let (command_tx, mut command_rx) = mpsc::channel::<SyncCommand>(config.queue_capacity);

        tokio::spawn(async move {
            let mut ticker = config.interval.map(|period| {
                let mut ticker = tokio::time::interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                ticker
            });
            let mut stats = SyncStats::default();

            loop {
                let first = tokio::select! {
                    cmd = command_rx.recv() => match cmd {
                        Some(cmd) => cmd,
                        None => break,
                    },
                    _ = next_tick(&mut ticker) => SyncCommand::Trigger,
                };

                let mut waiters = Vec::new();
                match first {
                    SyncCommand::Stats(reply) => {
                        let _ = reply.send(stats.clone());
                        continue;
                    }
                    SyncCommand::Shutdown => {
                        info!("Sync service shutting down");
                        break;
                    }
                    SyncCommand::SyncNow(reply) => waiters.push(reply),
                    SyncCommand::Trigger => {}
                }

                // Everything already queued is served by this one pass
                let mut shutdown = false;
                while let Ok(cmd) = command_rx.try_recv() {
                    match cmd {
                        SyncCommand::Trigger => stats.coalesced += 1,
                        SyncCommand::SyncNow(reply) => {
                            stats.coalesced += 1;
                            waiters.push(reply);
                        }
                        SyncCommand::Stats(reply) => {
                            let _ = reply.send(stats.clone());
                        }
                        SyncCommand::Shutdown => {
                            shutdown = true;
                            break;
                        }
                    }
                }

                let result = synchronizer.synchronize(&*ledger).await;
                match &result {
                    Ok(outcome) => debug!(?outcome, waiters = waiters.len(), "Sync pass complete"),
                    Err(e) => error!(error = %e, "Sync pass failed"),
                }
                stats.record(&result);

                for reply in waiters {
                    let _ = reply.send(result.clone());
                }

                if shutdown {
                    info!("Sync service shutting down");
                    break;
                }
            }

            info!(passes = stats.passes, updates = stats.updates, "Sync service stopped");
        });

        Self {
            command_tx,
            consistency: config.consistency,
        }
    }

    pub fn consistency(&self) -> ConsistencyMode {
        self.consistency
    }

    /// Request a pass without waiting. Returns false if the request was
    /// dropped because the queue is full or the worker is gone.
    pub fn trigger(&self) -> bool {
        match self.command_tx.try_send(SyncCommand::Trigger) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("Sync queue full, trigger dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Sync service stopped, trigger dropped");
                false
            }
        }
    }

    /// Run a pass and wait for its outcome
    pub async fn sync_now(&self) -> Result<SyncOutcome, SyncError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(SyncCommand::SyncNow(reply_tx))
            .await
            .map_err(|_| SyncError::ServiceUnavailable)?;
        reply_rx.await.map_err(|_| SyncError::ServiceUnavailable)?
    }

    /// After a deposit: trigger in eventual mode, wait in strict mode
    pub async fn after_deposit(&self) -> Option<Result<SyncOutcome, SyncError>> {
        match self.consistency {
            ConsistencyMode::Eventual => {
                self.trigger();
                None
            }
            ConsistencyMode::Strict => Some(self.sync_now().await),
        }
    }

    /// Before serving a proof: no-op in eventual mode, wait in strict mode
    pub async fn ensure_current(&self) -> Result<(), SyncError> {
        match self.consistency {
            ConsistencyMode::Eventual => Ok(()),
            ConsistencyMode::Strict => self.sync_now().await.map(|_| ()),
        }
    }

    /// Get service statistics
    pub async fn stats(&self) -> Result<SyncStats, SyncError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(SyncCommand::Stats(reply_tx))
            .await
            .map_err(|_| SyncError::ServiceUnavailable)?;
        reply_rx.await.map_err(|_| SyncError::ServiceUnavailable)
    }

    /// Shutdown the service
    pub async fn shutdown(&self) -> Result<(), SyncError> {
        self.command_tx
            .send(SyncCommand::Shutdown)
            .await
            .map_err(|_| SyncError::ServiceUnavailable)
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{InMemoryLedger, LedgerError};
    use aion_privacy::{FieldElement, PoseidonHasher};

    fn fe(v: u64) -> FieldElement {
        FieldElement::from(v)
    }

    fn start(ledger: Arc<InMemoryLedger>, config: SyncServiceConfig) -> SyncService {
        SyncService::start(
            RootSynchronizer::new(PoseidonHasher::default()),
            ledger,
            config,
        )
    }

    #[tokio::test]
    async fn test_sync_now_updates_then_current() {
        let ledger = Arc::new(InMemoryLedger::with_commitments(vec![fe(1), fe(2)]));
        let service = start(ledger.clone(), SyncServiceConfig::default());

        assert!(service.sync_now().await.unwrap().is_update());
        assert!(matches!(
            service.sync_now().await.unwrap(),
            SyncOutcome::AlreadyCurrent { leaf_count: 2, .. }
        ));

        let stats = service.stats().await.unwrap();
        assert_eq!(stats.passes, 2);
        assert_eq!(stats.updates, 1);
        assert_eq!(stats.failures, 0);
        assert_eq!(ledger.write_count().await, 1);
    }

    #[tokio::test]
    async fn test_failure_reported_and_counted() {
        let ledger = Arc::new(InMemoryLedger::with_commitments(vec![fe(1)]));
        ledger.set_reject_writes(true).await;
        let service = start(ledger.clone(), SyncServiceConfig::default());

        assert!(matches!(
            service.sync_now().await,
            Err(SyncError::Ledger(LedgerError::TransactionRejected(_)))
        ));
        let stats = service.stats().await.unwrap();
        assert_eq!(stats.failures, 1);
        assert!(stats.last_error.is_some());
        assert_eq!(ledger.current_root().await.unwrap(), FieldElement::ZERO);
    }

    #[tokio::test]
    async fn test_trigger_is_fire_and_forget() {
        let ledger = Arc::new(InMemoryLedger::with_commitments(vec![fe(3)]));
        let service = start(ledger.clone(), SyncServiceConfig::default());

        assert!(service.trigger());
        // The awaited pass never starts before the triggered one.
        let outcome = service.sync_now().await.unwrap();
        assert!(matches!(outcome, SyncOutcome::AlreadyCurrent { .. }) || outcome.is_update());
        assert_eq!(ledger.write_count().await, 1);
    }

    #[tokio::test]
    async fn test_queued_triggers_coalesce_into_one_pass() {
        let ledger = Arc::new(InMemoryLedger::with_commitments(vec![fe(1), fe(2), fe(3)]));
        let service = start(ledger.clone(), SyncServiceConfig::default());

        // The worker has not been polled yet, so all of these sit in the queue.
        for _ in 0..20 {
            assert!(service.trigger());
        }
        assert!(service.sync_now().await.unwrap().is_update());

        let stats = service.stats().await.unwrap();
        assert_eq!(stats.passes, 1);
        assert_eq!(stats.updates, 1);
        assert_eq!(stats.coalesced, 20);
        assert_eq!(ledger.write_count().await, 1);
    }

    #[tokio::test]
    async fn test_strict_mode_waits_after_deposit() {
        let ledger = Arc::new(InMemoryLedger::new());
        let config = SyncServiceConfig {
            consistency: ConsistencyMode::Strict,
            ..SyncServiceConfig::default()
        };
        let service = start(ledger.clone(), config);

        ledger.append(fe(9)).await;
        let outcome = service.after_deposit().await.unwrap().unwrap();
        assert!(outcome.is_update());
        service.ensure_current().await.unwrap();
    }

    #[tokio::test]
    async fn test_eventual_mode_returns_immediately() {
        let ledger = Arc::new(InMemoryLedger::new());
        let service = start(ledger, SyncServiceConfig::default());
        assert!(service.after_deposit().await.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_makes_service_unavailable() {
        let ledger = Arc::new(InMemoryLedger::new());
        let service = start(ledger, SyncServiceConfig::default());

        service.shutdown().await.unwrap();
        // The worker exits and drops the receiver.
        let mut result = service.sync_now().await;
        for _ in 0..10 {
            if result == Err(SyncError::ServiceUnavailable) {
                break;
            }
            tokio::task::yield_now().await;
            result = service.sync_now().await;
        }
        assert_eq!(result, Err(SyncError::ServiceUnavailable));
        assert!(!service.trigger());
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_pass() {
        let ledger = Arc::new(InMemoryLedger::with_commitments(vec![fe(1)]));
        let config = SyncServiceConfig {
            interval: Some(Duration::from_secs(30)),
            ..SyncServiceConfig::default()
        };
        let service = start(ledger.clone(), config);

        tokio::time::sleep(Duration::from_secs(1)).await;
        ledger.append(fe(2)).await;
        tokio::time::sleep(Duration::from_secs(31)).await;

        let stats = service.stats().await.unwrap();
        assert!(stats.passes >= 2);
        assert_eq!(ledger.write_count().await, 2);
    }

    #[test]
    fn test_config_from_toml_section() {
        let cfg = SyncConfig {
            consistency: ConsistencyMode::Strict,
            interval_secs: Some(0),
            queue_capacity: 0,
        };
        let service_cfg = SyncServiceConfig::from(&cfg);
        assert_eq!(service_cfg.queue_capacity, 1);
        assert!(service_cfg.interval.is_none());
        assert_eq!(service_cfg.consistency, ConsistencyMode::Strict);
    }
}
