//! Private Notes
//!
//! A note is the depositor's receipt for one fixed-size deposit.
//!
//! ```text
//! PrivateNote = {
//!     secret:        field,   // 248-bit random, never leaves the depositor
//!     nullifier:     field,   // 248-bit random, never leaves the depositor
//!     commitment:    field,   // H(secret, nullifier, tier), public leaf
//!     nullifierHash: field,   // H(nullifier), revealed at withdrawal
//!     tier:          0..=3,   // denomination, public
//!     createdAt:     i64,     // unix millis
//! }
//! ```
//!
//! The engine produces notes and forgets them; persistence belongs to the caller.

use std::fmt;
use std::str::FromStr;

use rand_core::{OsRng, TryCryptoRng};
use serde::{Deserialize, Serialize};

use crate::commitment::CommitmentScheme;
use crate::error::{PrivacyError, Result};
use crate::field::{FieldElement, random_scalar};
use crate::hasher::FieldHasher;

/// Prefix of the storage key derived from a commitment
pub const NOTE_KEY_PREFIX: &str = "aion_note_";

/// Number of commitment hex digits used in the storage key
const NOTE_KEY_DIGITS: usize = 8;

/// Fixed deposit sizes.
///
/// Every deposit in a tier is the same size, so amounts cannot fingerprint
/// depositors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DenominationTier {
    Tier0 = 0,
    Tier1 = 1,
    Tier2 = 2,
    Tier3 = 3,
}

impl DenominationTier {
    pub const ALL: [Self; 4] = [Self::Tier0, Self::Tier1, Self::Tier2, Self::Tier3];

    pub fn index(self) -> u8 {
        self as u8
    }

    /// Deposit size in the smallest indivisible unit (satoshi-equivalents)
    pub fn units(self) -> u64 {
        match self {
            Self::Tier0 => 100_000,
            Self::Tier1 => 1_000_000,
            Self::Tier2 => 10_000_000,
            Self::Tier3 => 100_000_000,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Tier0 => "0.001 WBTC",
            Self::Tier1 => "0.01 WBTC",
            Self::Tier2 => "0.1 WBTC",
            Self::Tier3 => "1.0 WBTC",
        }
    }

    /// Tier as absorbed into the commitment
    pub fn to_field(self) -> FieldElement {
        FieldElement::from(u64::from(self.index()))
    }
}

impl TryFrom<u8> for DenominationTier {
    type Error = PrivacyError;

    fn try_from(v: u8) -> Result<Self> {
        match v {
            0 => Ok(Self::Tier0),
            1 => Ok(Self::Tier1),
            2 => Ok(Self::Tier2),
            3 => Ok(Self::Tier3),
            other => Err(PrivacyError::InvalidTier(u64::from(other))),
        }
    }
}

impl From<DenominationTier> for u8 {
    fn from(tier: DenominationTier) -> Self {
        tier.index()
    }
}

impl FromStr for DenominationTier {
    type Err = PrivacyError;

    fn from_str(s: &str) -> Result<Self> {
        let v: u64 = s
            .trim()
            .parse()
            .map_err(|_| PrivacyError::InvalidTier(u64::MAX))?;
        u8::try_from(v)
            .map_err(|_| PrivacyError::InvalidTier(v))
            .and_then(Self::try_from)
    }
}

impl fmt::Display for DenominationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tier {} ({})", self.index(), self.label())
    }
}

/// A depositor's private note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateNote {
    pub secret: FieldElement,
    pub nullifier: FieldElement,
    pub commitment: FieldElement,
    pub nullifier_hash: FieldElement,
    #[serde(alias = "denominationTier")]
    pub tier: DenominationTier,
    /// Creation time, unix milliseconds
    #[serde(alias = "timestamp")]
    pub created_at: i64,
}

impl PrivateNote {
    /// Storage key for this note
    pub fn key(&self) -> String {
        note_key(&self.commitment)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Storage key derived from the leading hex digits of a commitment
pub fn note_key(commitment: &FieldElement) -> String {
    let hex = commitment.to_hex();
    let digits = &hex[2..];
    let end = digits.len().min(NOTE_KEY_DIGITS);
    format!("{NOTE_KEY_PREFIX}{}", &digits[..end])
}

/// Generates notes and re-derives their public values
#[derive(Debug, Clone, Default)]
pub struct NoteEngine<H> {
    scheme: CommitmentScheme<H>,
}

impl<H: FieldHasher> NoteEngine<H> {
    pub fn new(hasher: H) -> Self {
        Self {
            scheme: CommitmentScheme::new(hasher),
        }
    }

    pub fn scheme(&self) -> &CommitmentScheme<H> {
        &self.scheme
    }

    /// Generate a fresh note from the OS random source
    pub fn generate_note(&self, tier: DenominationTier) -> Result<PrivateNote> {
        self.generate_note_with_rng(&mut OsRng, tier)
    }

    /// Generate a fresh note from a caller-supplied cryptographic RNG.
    ///
    /// Fails with `RandomnessUnavailable` if the RNG cannot be sampled.
    pub fn generate_note_with_rng<R: TryCryptoRng + ?Sized>(
        &self,
        rng: &mut R,
        tier: DenominationTier,
    ) -> Result<PrivateNote> {
        let secret = random_scalar(rng)?;
        let mut nullifier = random_scalar(rng)?;
        while nullifier == secret {
            nullifier = random_scalar(rng)?;
        }

        let commitment = self.scheme.commit(&secret, &nullifier, tier);
        let nullifier_hash = self.scheme.nullifier_hash(&nullifier);

        Ok(PrivateNote {
            secret,
            nullifier,
            commitment,
            nullifier_hash,
            tier,
            created_at: chrono::Utc::now().timestamp_millis(),
        })
    }

    /// Re-derive a commitment from manually entered secrets
    pub fn recompute_commitment(
        &self,
        secret: &FieldElement,
        nullifier: &FieldElement,
        tier: DenominationTier,
    ) -> FieldElement {
        self.scheme.commit(secret, nullifier, tier)
    }

    pub fn nullifier_hash(&self, nullifier: &FieldElement) -> FieldElement {
        self.scheme.nullifier_hash(nullifier)
    }

    /// Check a (possibly deserialized) note against its own secrets
    pub fn verify_note(&self, note: &PrivateNote) -> Result<()> {
        if self.recompute_commitment(&note.secret, &note.nullifier, note.tier) != note.commitment {
            return Err(PrivacyError::NoteMismatch {
                field: "commitment",
            });
        }
        if self.nullifier_hash(&note.nullifier) != note.nullifier_hash {
            return Err(PrivacyError::NoteMismatch {
                field: "nullifierHash",
            });
        }
        Ok(())
    }
}
