//! Ledger Collaborator
//!
//! The ledger owns the append-only commitment list and the root register.
//! This crate only reads the list and asks for the root to be replaced.
//!
//! ```text
//! total_commitments()      -> u32
//! commitment_at(index)     -> field         IndexOutOfRange
//! current_root()           -> field
//! set_root(root)           -> receipt       Unauthorized | TransactionRejected
//! ```

use std::future::Future;
use std::sync::Arc;

use aion_privacy::FieldElement;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod memory;
pub mod rpc;

pub use memory::InMemoryLedger;
pub use rpc::RpcLedger;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("commitment index {0} out of range")]
    IndexOutOfRange(u32),

    #[error("root write not authorized: {0}")]
    Unauthorized(String),

    #[error("root write rejected: {0}")]
    TransactionRejected(String),

    #[error("ledger transport error: {0}")]
    Transport(String),

    #[error("invalid ledger response: {0}")]
    InvalidResponse(String),
}

/// Acknowledgement of an accepted root write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub tx_hash: String,
}

/// Read access to the commitment list plus the privileged root write
pub trait Ledger: Send + Sync {
    fn total_commitments(&self) -> impl Future<Output = Result<u32, LedgerError>> + Send;

    fn commitment_at(
        &self,
        index: u32,
    ) -> impl Future<Output = Result<FieldElement, LedgerError>> + Send;

    fn current_root(&self) -> impl Future<Output = Result<FieldElement, LedgerError>> + Send;

    fn set_root(
        &self,
        root: FieldElement,
    ) -> impl Future<Output = Result<TransactionReceipt, LedgerError>> + Send;
}

impl<L: Ledger> Ledger for Arc<L> {
    async fn total_commitments(&self) -> Result<u32, LedgerError> {
        (**self).total_commitments().await
    }

    async fn commitment_at(&self, index: u32) -> Result<FieldElement, LedgerError> {
        (**self).commitment_at(index).await
    }

    async fn current_root(&self) -> Result<FieldElement, LedgerError> {
        (**self).current_root().await
    }

    async fn set_root(&self, root: FieldElement) -> Result<TransactionReceipt, LedgerError> {
        (**self).set_root(root).await
    }
}

/// Ledger selected by configuration
pub enum LedgerClient {
    Memory(Arc<InMemoryLedger>),
    Rpc(RpcLedger),
}

impl LedgerClient {
    /// The in-memory ledger, if that is the active backend
    pub fn as_memory(&self) -> Option<&Arc<InMemoryLedger>> {
        match self {
            Self::Memory(ledger) => Some(ledger),
            Self::Rpc(_) => None,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Rpc(_) => "rpc",
        }
    }
}

impl Ledger for LedgerClient {
    async fn total_commitments(&self) -> Result<u32, LedgerError> {
        match self {
            Self::Memory(ledger) => ledger.total_commitments().await,
            Self::Rpc(ledger) => ledger.total_commitments().await,
        }
    }

    async fn commitment_at(&self, index: u32) -> Result<FieldElement, LedgerError> {
        match self {
            Self::Memory(ledger) => ledger.commitment_at(index).await,
            Self::Rpc(ledger) => ledger.commitment_at(index).await,
        }
    }

    async fn current_root(&self) -> Result<FieldElement, LedgerError> {
        match self {
            Self::Memory(ledger) => ledger.current_root().await,
            Self::Rpc(ledger) => ledger.current_root().await,
        }
    }

    async fn set_root(&self, root: FieldElement) -> Result<TransactionReceipt, LedgerError> {
        match self {
            Self::Memory(ledger) => ledger.set_root(root).await,
            Self::Rpc(ledger) => ledger.set_root(root).await,
        }
    }
}
