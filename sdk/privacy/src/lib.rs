//! AION Privacy SDK
//!
//! Commitment/nullifier primitives for fixed-denomination shielded deposits,
//! and the sorted-pair Merkle engine the ledger verifies withdrawals against.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Private Note                          │
//! │   secret, nullifier  ──►  commitment = H(s, n, tier)         │
//! │                      ──►  nullifierHash = H(n)               │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │ deposited on the ledger
//!                                ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 Leaf Sequence (ledger order)                 │
//! │   C0  C1  C2 ...  ──►  Merkle Engine  ──►  root, proofs      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! All hashing goes through one [`FieldHasher`], injected once. Nothing in this
//! crate performs I/O or keeps state between calls.

pub mod commitment;
pub mod error;
pub mod field;
pub mod hasher;
pub mod merkle;
pub mod note;

pub use commitment::CommitmentScheme;
pub use error::{PrivacyError, Result};
pub use field::{FieldElement, random_scalar};
pub use hasher::{
    ConformanceVector, FieldHasher, PoseidonHasher, SpongeVariant, check_conformance, load_vectors,
};
pub use merkle::{MerkleEngine, MerkleProof, MerkleTree};
pub use note::{DenominationTier, NOTE_KEY_PREFIX, NoteEngine, PrivateNote, note_key};
