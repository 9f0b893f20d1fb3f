//! API Types
//!
//! Request/response types for the HTTP API.

use aion_privacy::{FieldElement, MerkleProof, PrivateNote};
use serde::{Deserialize, Serialize};

use crate::sync::SyncOutcome;

// ============================================================================
// Notes
// ============================================================================

/// Request to generate a note
#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub tier: u8,
}

/// A note together with its storage key
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredNoteResponse {
    pub key: String,
    pub note: PrivateNote,
    /// Deposit size in the smallest asset unit
    pub units: u64,
    pub label: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListNotesResponse {
    pub count: usize,
    pub notes: Vec<StoredNoteResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteNoteResponse {
    pub key: String,
    pub removed: bool,
}

/// Request to recompute a commitment from manually entered secrets
#[derive(Debug, Deserialize)]
pub struct CommitmentRequest {
    pub secret: String,
    pub nullifier: String,
    pub tier: u8,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentResponse {
    pub commitment: FieldElement,
    pub nullifier_hash: FieldElement,
    pub key: String,
}

// ============================================================================
// Merkle
// ============================================================================

/// Proof lookup, by commitment value or by leaf index
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRequest {
    pub commitment: String,
    #[serde(default)]
    pub leaf_index: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofResponse {
    pub proof: MerkleProof,
    pub root: FieldElement,
    pub leaf_count: usize,
}

// ============================================================================
// Dev Mode
// ============================================================================

/// Append a commitment to the in-memory ledger
#[derive(Debug, Deserialize)]
pub struct DevDepositRequest {
    pub commitment: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevDepositResponse {
    pub index: u32,
    /// Outcome of the pass awaited in strict mode
    pub sync: Option<SyncOutcome>,
    /// Failure of the pass awaited in strict mode; the deposit still stands
    pub sync_error: Option<String>,
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: String,
    pub uptime_secs: u64,
    pub hasher: String,
    pub ledger: String,
}

// ============================================================================
// Error Response
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(msg, "BAD_REQUEST")
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(msg, "INTERNAL_ERROR")
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(msg, "NOT_FOUND")
    }

    pub fn ledger(msg: impl Into<String>) -> Self {
        Self::new(msg, "LEDGER_ERROR")
    }
}
