//! Note Commitments
//!
//! ```text
//! commitment     = H(secret, nullifier, tier)
//! nullifier_hash = H(nullifier)
//! ```
//!
//! The tier is absorbed last so a note cannot be redeemed against a different
//! denomination. Only the commitment and the tier ever reach the ledger; the
//! nullifier hash is revealed at withdrawal.

use crate::field::FieldElement;
use crate::hasher::FieldHasher;
use crate::note::DenominationTier;

/// Commitment scheme over an injected hash strategy
#[derive(Debug, Clone, Default)]
pub struct CommitmentScheme<H> {
    hasher: H,
}

impl<H: FieldHasher> CommitmentScheme<H> {
    pub fn new(hasher: H) -> Self {
        Self { hasher }
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Commit to a note: C = H(secret, nullifier, tier)
    pub fn commit(
        &self,
        secret: &FieldElement,
        nullifier: &FieldElement,
        tier: DenominationTier,
    ) -> FieldElement {
        self.hasher
            .hash_elements(&[*secret, *nullifier, tier.to_field()])
    }

    /// Public spend tag: N = H(nullifier)
    pub fn nullifier_hash(&self, nullifier: &FieldElement) -> FieldElement {
        self.hasher.hash_elements(&[*nullifier])
    }
}
