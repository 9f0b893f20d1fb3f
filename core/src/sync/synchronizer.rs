//! Root Synchronizer
//!
//! One pass re-derives the whole leaf sequence from the ledger, rebuilds the
//! tree and replaces the ledger root only when it differs.
//!
//! ```text
//! count = total_commitments()          0 -> NothingToSync
//! leaves = commitment_at(0..count)     sequential
//! root = merkle(leaves)
//! current = current_root()             equal -> AlreadyCurrent
//! set_root(root)                       -> Updated
//! ```
//!
//! Nothing is cached between passes. A pass is idempotent but not atomic with
//! respect to appends that land mid-pass; the next pass picks those up.

use aion_privacy::{FieldElement, FieldHasher, MerkleEngine};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::SyncError;
use crate::ledger::{Ledger, TransactionReceipt};

/// Result of one synchronization pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SyncOutcome {
    NothingToSync,
    #[serde(rename_all = "camelCase")]
    AlreadyCurrent {
        root: FieldElement,
        leaf_count: u32,
    },
    #[serde(rename_all = "camelCase")]
    Updated {
        new_root: FieldElement,
        previous_root: FieldElement,
        leaf_count: u32,
        receipt: TransactionReceipt,
    },
}

impl SyncOutcome {
    pub fn is_update(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }
}

/// Read-only comparison of the computed and recorded roots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootStatus {
    pub leaf_count: u32,
    pub computed_root: FieldElement,
    pub ledger_root: FieldElement,
    pub stale: bool,
}

/// Root one candidate hasher produces for the current leaves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRoot {
    pub hasher: String,
    pub root: FieldElement,
    pub matches_ledger: bool,
}

/// Which hasher, if any, reproduces the ledger's recorded root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootDiagnosis {
    pub leaf_count: u32,
    pub ledger_root: FieldElement,
    pub candidates: Vec<CandidateRoot>,
    pub matching: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RootSynchronizer<H> {
    engine: MerkleEngine<H>,
}

impl<H: FieldHasher> RootSynchronizer<H> {
    pub fn new(hasher: H) -> Self {
        Self {
            engine: MerkleEngine::new(hasher),
        }
    }

    pub fn engine(&self) -> &MerkleEngine<H> {
        &self.engine
    }

    /// The full leaf sequence, in ledger order
    pub async fn fetch_leaves<L: Ledger + ?Sized>(
        &self,
        ledger: &L,
    ) -> Result<Vec<FieldElement>, SyncError> {
        read_leaves(ledger).await
    }

    /// Run one pass, writing the root only if it changed
    pub async fn synchronize<L: Ledger + ?Sized>(
        &self,
        ledger: &L,
    ) -> Result<SyncOutcome, SyncError> {
        let leaves = self.fetch_leaves(ledger).await?;
        if leaves.is_empty() {
            debug!("No commitments on the ledger, nothing to sync");
            return Ok(SyncOutcome::NothingToSync);
        }

        let leaf_count = leaves.len() as u32;
        let new_root = self.engine.root(&leaves);
        let current = ledger.current_root().await?;

        if new_root == current {
            debug!(leaf_count, root = %current, "Ledger root already current");
            return Ok(SyncOutcome::AlreadyCurrent {
                root: current,
                leaf_count,
            });
        }

        let receipt = ledger.set_root(new_root).await?;
        info!(
            leaf_count,
            previous = %current,
            root = %new_root,
            tx = %receipt.tx_hash,
            hasher = self.engine.hasher().name(),
            "Ledger root updated"
        );

        Ok(SyncOutcome::Updated {
            new_root,
            previous_root: current,
            leaf_count,
            receipt,
        })
    }

    /// Dry run: compare without writing
    pub async fn status<L: Ledger + ?Sized>(&self, ledger: &L) -> Result<RootStatus, SyncError> {
        let leaves = self.fetch_leaves(ledger).await?;
        let computed_root = self.engine.root(&leaves);
        let ledger_root = ledger.current_root().await?;

        Ok(RootStatus {
            leaf_count: leaves.len() as u32,
            computed_root,
            ledger_root,
            stale: !leaves.is_empty() && computed_root != ledger_root,
        })
    }
}

async fn read_leaves<L: Ledger + ?Sized>(ledger: &L) -> Result<Vec<FieldElement>, SyncError> {
    let count = ledger.total_commitments().await?;
    let mut leaves = Vec::with_capacity(count as usize);
    for index in 0..count {
        leaves.push(ledger.commitment_at(index).await?);
    }
    Ok(leaves)
}

/// Recompute the root with every candidate and see which one the ledger used.
///
/// Detects a root that was published with the wrong hash variant.
pub async fn diagnose<L, H>(ledger: &L, candidates: &[H]) -> Result<RootDiagnosis, SyncError>
where
    L: Ledger + ?Sized,
    H: FieldHasher,
{
    let leaves = read_leaves(ledger).await?;
    let ledger_root = ledger.current_root().await?;

    let candidates: Vec<CandidateRoot> = candidates
        .iter()
        .map(|hasher| {
            let root = MerkleEngine::new(hasher).root(&leaves);
            CandidateRoot {
                hasher: hasher.name().to_string(),
                root,
                matches_ledger: root == ledger_root,
            }
        })
        .collect();

    let matching = candidates
        .iter()
        .find(|c| c.matches_ledger)
        .map(|c| c.hasher.clone());

    Ok(RootDiagnosis {
        leaf_count: leaves.len() as u32,
        ledger_root,
        candidates,
        matching,
    })
}
