//! API Handlers
//!
//! Request handlers for the HTTP API.

use std::sync::Arc;
use std::time::Instant;

use aion_privacy::{
    DenominationTier, FieldElement, FieldHasher, NoteEngine, PoseidonHasher, PrivacyError,
    PrivateNote, note_key,
};
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use log::{error, info, warn};

use super::types::*;
use crate::ledger::LedgerClient;
use crate::storage::NoteStore;
use crate::sync::{RootSynchronizer, SyncError, SyncService};

// ============================================================================
// Shared State
// ============================================================================

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub notes: Arc<NoteEngine<PoseidonHasher>>,
    pub synchronizer: Arc<RootSynchronizer<PoseidonHasher>>,
    pub ledger: Arc<LedgerClient>,
    pub store: Arc<dyn NoteStore>,
    pub sync_service: Arc<SyncService>,
    pub dev_mode: bool,
    pub start_time: Instant,
}

// ============================================================================
// Error Mapping
// ============================================================================

fn reject(status: StatusCode, body: ErrorResponse) -> Response {
    (status, Json(body)).into_response()
}

fn sync_failure(e: &SyncError) -> Response {
    match e {
        SyncError::Ledger(inner) => {
            warn!("Ledger call failed: {}", inner);
            reject(StatusCode::BAD_GATEWAY, ErrorResponse::ledger(inner.to_string()))
        }
        SyncError::ServiceUnavailable => {
            error!("Sync service unavailable");
            reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::internal(e.to_string()),
            )
        }
    }
}

fn privacy_failure(e: &PrivacyError) -> Response {
    match e {
        PrivacyError::LeafNotFound(_) | PrivacyError::IndexOutOfBounds { .. } => {
            reject(StatusCode::NOT_FOUND, ErrorResponse::not_found(e.to_string()))
        }
        PrivacyError::InvalidFieldElement(_) | PrivacyError::InvalidTier(_) => {
            reject(StatusCode::BAD_REQUEST, ErrorResponse::bad_request(e.to_string()))
        }
        _ => {
            error!("Privacy engine error: {}", e);
            reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::internal(e.to_string()),
            )
        }
    }
}

fn storage_failure(e: anyhow::Error) -> Response {
    error!("Note store error: {:#}", e);
    reject(
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorResponse::internal("Note store unavailable"),
    )
}

fn parse_field(raw: &str) -> Result<FieldElement, Response> {
    FieldElement::from_hex(raw).map_err(|e| privacy_failure(&e))
}

fn parse_tier(raw: u8) -> Result<DenominationTier, Response> {
    DenominationTier::try_from(raw).map_err(|e| privacy_failure(&e))
}

fn stored_note(key: String, note: PrivateNote) -> StoredNoteResponse {
    StoredNoteResponse {
        key,
        units: note.tier.units(),
        label: note.tier.label().to_string(),
        note,
    }
}

// ============================================================================
// Health
// ============================================================================

/// Health check endpoint
pub async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        hasher: state.synchronizer.engine().hasher().name().to_string(),
        ledger: state.ledger.backend_name().to_string(),
    })
}

// ============================================================================
// Notes
// ============================================================================

/// Generate and store a fresh note
pub async fn create_note(
    State(state): State<ApiState>,
    Json(req): Json<CreateNoteRequest>,
) -> impl IntoResponse {
    let tier = match parse_tier(req.tier) {
        Ok(tier) => tier,
        Err(resp) => return resp,
    };

    let note = match state.notes.generate_note(tier) {
        Ok(note) => note,
        Err(e) => return privacy_failure(&e),
    };

    let key = note.key();
    if let Err(e) = state.store.put(&key, &note) {
        return storage_failure(e);
    }

    info!("Generated {} note {}", tier, key);
    (StatusCode::CREATED, Json(stored_note(key, note))).into_response()
}

/// List stored notes, oldest first
pub async fn list_notes(State(state): State<ApiState>) -> impl IntoResponse {
    match state.store.get_all() {
        Ok(notes) => {
            let notes: Vec<_> = notes
                .into_iter()
                .map(|(key, note)| stored_note(key, note))
                .collect();
            Json(ListNotesResponse {
                count: notes.len(),
                notes,
            })
            .into_response()
        }
        Err(e) => storage_failure(e),
    }
}

/// Forget a note after withdrawal
pub async fn delete_note(
    State(state): State<ApiState>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    match state.store.remove(&key) {
        Ok(true) => Json(DeleteNoteResponse { key, removed: true }).into_response(),
        Ok(false) => reject(
            StatusCode::NOT_FOUND,
            ErrorResponse::not_found(format!("note {key} not found")),
        ),
        Err(e) => storage_failure(e),
    }
}

/// Recompute commitment and nullifier hash from manual input
pub async fn compute_commitment(
    State(state): State<ApiState>,
    Json(req): Json<CommitmentRequest>,
) -> impl IntoResponse {
    let parsed = parse_field(&req.secret).and_then(|secret| {
        let nullifier = parse_field(&req.nullifier)?;
        let tier = parse_tier(req.tier)?;
        Ok((secret, nullifier, tier))
    });
    let (secret, nullifier, tier) = match parsed {
        Ok(values) => values,
        Err(resp) => return resp,
    };

    let commitment = state.notes.recompute_commitment(&secret, &nullifier, tier);
    Json(CommitmentResponse {
        commitment,
        nullifier_hash: state.notes.nullifier_hash(&nullifier),
        key: note_key(&commitment),
    })
    .into_response()
}

// ============================================================================
// Merkle
// ============================================================================

/// Computed vs recorded root, without writing
pub async fn merkle_status(State(state): State<ApiState>) -> impl IntoResponse {
    match state.synchronizer.status(&*state.ledger).await {
        Ok(status) => Json(status).into_response(),
        Err(e) => sync_failure(&e),
    }
}

/// Inclusion proof against the ledger's current leaves
pub async fn merkle_proof(
    State(state): State<ApiState>,
    Json(req): Json<ProofRequest>,
) -> impl IntoResponse {
    let commitment = match parse_field(&req.commitment) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    if let Err(e) = state.sync_service.ensure_current().await {
        return sync_failure(&e);
    }

    let leaves = match state.synchronizer.fetch_leaves(&*state.ledger).await {
        Ok(leaves) => leaves,
        Err(e) => return sync_failure(&e),
    };
    let tree = state.synchronizer.engine().tree(&leaves);

    let proof = match req.leaf_index {
        Some(index) => tree.proof_at(index).and_then(|proof| {
            if proof.leaf == commitment {
                Ok(proof)
            } else {
                Err(PrivacyError::LeafNotFound(commitment))
            }
        }),
        None => tree.proof_for(&commitment),
    };

    match proof {
        Ok(proof) => Json(ProofResponse {
            proof,
            root: tree.root(),
            leaf_count: tree.leaf_count(),
        })
        .into_response(),
        Err(e) => privacy_failure(&e),
    }
}

// ============================================================================
// Sync
// ============================================================================

/// Run a synchronization pass and return its outcome
pub async fn sync_root(State(state): State<ApiState>) -> impl IntoResponse {
    match state.sync_service.sync_now().await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => sync_failure(&e),
    }
}

/// Sync service statistics
pub async fn sync_stats(State(state): State<ApiState>) -> impl IntoResponse {
    match state.sync_service.stats().await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => sync_failure(&e),
    }
}

// ============================================================================
// Dev Mode
// ============================================================================

/// Append a commitment to the in-memory ledger and schedule a pass
pub async fn dev_deposit(
    State(state): State<ApiState>,
    Json(req): Json<DevDepositRequest>,
) -> impl IntoResponse {
    let Some(ledger) = state.ledger.as_memory() else {
        return reject(
            StatusCode::BAD_REQUEST,
            ErrorResponse::bad_request("dev deposits require the in-memory ledger"),
        );
    };

    let commitment = match parse_field(&req.commitment) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let index = ledger.append(commitment).await;
    info!("Dev deposit {} at index {}", commitment, index);

    let (sync, sync_error) = match state.sync_service.after_deposit().await {
        None => (None, None),
        Some(Ok(outcome)) => (Some(outcome), None),
        Some(Err(e)) => {
            warn!("Sync after dev deposit failed: {}", e);
            (None, Some(e.to_string()))
        }
    };

    Json(DevDepositResponse {
        index,
        sync,
        sync_error,
    })
    .into_response()
}
