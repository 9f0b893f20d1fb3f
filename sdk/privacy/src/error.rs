//! Errors raised by the privacy primitives.

use thiserror::Error;

use crate::field::FieldElement;

/// Result alias for the privacy crate
pub type Result<T> = std::result::Result<T, PrivacyError>;

#[derive(Debug, Error)]
pub enum PrivacyError {
    /// The secure random source could not be sampled. Never retried with a weaker source.
    #[error("secure randomness unavailable: {0}")]
    RandomnessUnavailable(String),

    #[error("leaf {0} not found in leaf sequence")]
    LeafNotFound(FieldElement),

    #[error("leaf index {index} out of bounds for {len} leaves")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("invalid field element: {0}")]
    InvalidFieldElement(String),

    #[error("invalid denomination tier: {0}")]
    InvalidTier(u64),

    /// A stored note whose derived values disagree with its secrets
    #[error("note {field} does not match its derivation")]
    NoteMismatch { field: &'static str },

    #[error("hash vector {index} mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        index: usize,
        expected: FieldElement,
        actual: FieldElement,
    },

    #[error("no hash conformance vectors supplied")]
    NoConformanceVectors,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
