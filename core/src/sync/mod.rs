//! Root synchronization: the pass itself and the single-writer service that
//! serializes passes.

use thiserror::Error;

use crate::ledger::LedgerError;

pub mod service;
pub mod synchronizer;

pub use service::{SyncCommand, SyncService, SyncServiceConfig, SyncStats};
pub use synchronizer::{
    CandidateRoot, RootDiagnosis, RootStatus, RootSynchronizer, SyncOutcome, diagnose,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("sync service unavailable")]
    ServiceUnavailable,
}
