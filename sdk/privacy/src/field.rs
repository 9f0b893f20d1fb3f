//! Field Elements
//!
//! Every value crossing the engine boundary (secrets, nullifiers, commitments,
//! tree nodes, roots) is an element of the BLS12-381 scalar field.
//!
//! ```text
//! wire form:  0x<lowercase hex, no leading zeros>   e.g. 0x0, 0x1f, 0xab..
//! ordering:   numeric, on the canonical big integer
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use ark_bls12_381::Fr;
use ark_ff::{AdditiveGroup, BigInteger, Field, PrimeField};
use rand_core::TryCryptoRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{PrivacyError, Result};

/// Width of a random note scalar in bytes (248 bits, always below the modulus)
pub const RANDOM_SCALAR_BYTES: usize = 31;

/// Byte width of a canonical field element
pub const FIELD_BYTES: usize = 32;

/// An element of the BLS12-381 scalar field
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FieldElement(Fr);

impl FieldElement {
    pub const ZERO: Self = Self(Fr::ZERO);
    pub const ONE: Self = Self(Fr::ONE);

    /// Wrap an arkworks field element
    pub fn from_fr(f: Fr) -> Self {
        Self(f)
    }

    /// Underlying arkworks field element (for sponge absorption)
    pub fn to_fr(&self) -> Fr {
        self.0
    }

    /// Build from canonical big-endian bytes.
    ///
    /// Rejects values that are not strictly below the field modulus instead of
    /// silently reducing them.
    pub fn from_be_bytes(bytes: &[u8; FIELD_BYTES]) -> Result<Self> {
        let f = Fr::from_be_bytes_mod_order(bytes);
        if f.into_bigint().to_bytes_be().as_slice() != bytes.as_slice() {
            return Err(PrivacyError::InvalidFieldElement(
                "value is not below the field modulus".into(),
            ));
        }
        Ok(Self(f))
    }

    /// Canonical big-endian bytes
    pub fn to_be_bytes(&self) -> [u8; FIELD_BYTES] {
        let bytes = self.0.into_bigint().to_bytes_be();
        let mut arr = [0u8; FIELD_BYTES];
        arr[FIELD_BYTES - bytes.len()..].copy_from_slice(&bytes);
        arr
    }

    /// Parse a hex string, with or without `0x`, either case.
    pub fn from_hex(s: &str) -> Result<Self> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.is_empty() {
            return Err(PrivacyError::InvalidFieldElement(format!(
                "empty hex string: {s:?}"
            )));
        }

        let significant = digits.trim_start_matches('0');
        if significant.len() > FIELD_BYTES * 2 {
            return Err(PrivacyError::InvalidFieldElement(format!(
                "hex value wider than {FIELD_BYTES} bytes: {s}"
            )));
        }

        let padded = format!("{significant:0>64}");
        let mut bytes = [0u8; FIELD_BYTES];
        hex::decode_to_slice(&padded, &mut bytes)
            .map_err(|e| PrivacyError::InvalidFieldElement(format!("{s}: {e}")))?;

        Self::from_be_bytes(&bytes)
    }

    /// Canonical wire form: `0x` + lowercase hex without leading zeros
    pub fn to_hex(&self) -> String {
        let encoded = hex::encode(self.to_be_bytes());
        let trimmed = encoded.trim_start_matches('0');
        if trimmed.is_empty() {
            "0x0".to_string()
        } else {
            format!("0x{trimmed}")
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl From<u64> for FieldElement {
    fn from(v: u64) -> Self {
        Self(Fr::from(v))
    }
}

impl Ord for FieldElement {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.into_bigint().cmp(&other.0.into_bigint())
    }
}

impl PartialOrd for FieldElement {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldElement({})", self.to_hex())
    }
}

impl FromStr for FieldElement {
    type Err = PrivacyError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for FieldElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Draw a fresh 248-bit scalar from a cryptographic RNG.
///
/// All 31 bytes come from the source; the value is below the modulus by
/// construction, so nothing is reduced.
pub fn random_scalar<R: TryCryptoRng + ?Sized>(rng: &mut R) -> Result<FieldElement> {
    let mut bytes = [0u8; FIELD_BYTES];
    rng.try_fill_bytes(&mut bytes[FIELD_BYTES - RANDOM_SCALAR_BYTES..])
        .map_err(|e| PrivacyError::RandomnessUnavailable(e.to_string()))?;
    FieldElement::from_be_bytes(&bytes)
}
