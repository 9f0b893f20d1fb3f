//! In-process ledger used by tests and dev mode.

use aion_privacy::FieldElement;
use log::debug;
use tokio::sync::Mutex;

use super::{Ledger, LedgerError, TransactionReceipt};

#[derive(Debug, Default)]
struct LedgerState {
    commitments: Vec<FieldElement>,
    root: FieldElement,
    admin_revoked: bool,
    reject_writes: bool,
    fail_reads: bool,
    writes: u64,
}

/// Append-only commitment list with a root register, kept in memory
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger preloaded with `commitments`, root register at zero
    pub fn with_commitments(commitments: Vec<FieldElement>) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                commitments,
                ..LedgerState::default()
            }),
        }
    }

    /// Record a deposit; returns the leaf index
    pub async fn append(&self, commitment: FieldElement) -> u32 {
        let mut state = self.state.lock().await;
        state.commitments.push(commitment);
        let index = (state.commitments.len() - 1) as u32;
        debug!("ledger: commitment {} appended at {}", commitment, index);
        index
    }

    pub async fn commitments(&self) -> Vec<FieldElement> {
        self.state.lock().await.commitments.clone()
    }

    /// Grant or revoke the root-write privilege
    pub async fn set_admin(&self, authorized: bool) {
        self.state.lock().await.admin_revoked = !authorized;
    }

    /// Make every root write fail as a rejected transaction
    pub async fn set_reject_writes(&self, reject: bool) {
        self.state.lock().await.reject_writes = reject;
    }

    /// Make every read fail as a transport error
    pub async fn set_fail_reads(&self, fail: bool) {
        self.state.lock().await.fail_reads = fail;
    }

    /// Accepted root writes so far
    pub async fn write_count(&self) -> u64 {
        self.state.lock().await.writes
    }

    /// Overwrite the root register without counting a write
    pub async fn force_root(&self, root: FieldElement) {
        self.state.lock().await.root = root;
    }
}

fn check_reads(state: &LedgerState) -> Result<(), LedgerError> {
    if state.fail_reads {
        return Err(LedgerError::Transport("ledger unreachable".into()));
    }
    Ok(())
}

impl Ledger for InMemoryLedger {
    async fn total_commitments(&self) -> Result<u32, LedgerError> {
        let state = self.state.lock().await;
        check_reads(&state)?;
        Ok(state.commitments.len() as u32)
    }

    async fn commitment_at(&self, index: u32) -> Result<FieldElement, LedgerError> {
        let state = self.state.lock().await;
        check_reads(&state)?;
        state
            .commitments
            .get(index as usize)
            .copied()
            .ok_or(LedgerError::IndexOutOfRange(index))
    }

    async fn current_root(&self) -> Result<FieldElement, LedgerError> {
        let state = self.state.lock().await;
        check_reads(&state)?;
        Ok(state.root)
    }

    async fn set_root(&self, root: FieldElement) -> Result<TransactionReceipt, LedgerError> {
        let mut state = self.state.lock().await;
        if state.admin_revoked {
            return Err(LedgerError::Unauthorized(
                "caller is not the ledger admin".into(),
            ));
        }
        if state.reject_writes {
            return Err(LedgerError::TransactionRejected(
                "transaction reverted".into(),
            ));
        }

        state.writes += 1;
        state.root = root;

        let mut hasher = blake3::Hasher::new();
        hasher.update(&root.to_be_bytes());
        hasher.update(&state.writes.to_le_bytes());
        Ok(TransactionReceipt {
            tx_hash: format!("0x{}", hex::encode(hasher.finalize().as_bytes())),
        })
    }
}
