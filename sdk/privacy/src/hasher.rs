//! Hash Adapter
//!
//! One sponge hash over an ordered list of field elements, shared by commitment
//! derivation, nullifier hashing and Merkle node combination.
//!
//! ```text
//! on-elements:  absorb(x0 .. xn) ; absorb(1) ; squeeze      (default)
//! unpadded:     absorb(x0 .. xn) ; squeeze
//! ```
//!
//! The two variants agree on nothing: a root built with one will never verify
//! against a ledger that uses the other. Pick one strategy at startup and pass
//! it everywhere; check it against known vectors from the verifying ledger with
//! [`check_conformance`] before trusting any root.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use ark_bls12_381::Fr;
use ark_crypto_primitives::sponge::{
    CryptographicSponge,
    poseidon::{PoseidonConfig, PoseidonSponge, find_poseidon_ark_and_mds},
};
use serde::{Deserialize, Serialize};

use crate::error::{PrivacyError, Result};
use crate::field::FieldElement;

/// Round constants are expensive to derive, so every hasher shares one copy.
static POSEIDON_CONFIG: LazyLock<Arc<PoseidonConfig<Fr>>> =
    LazyLock::new(|| Arc::new(poseidon_config()));

/// A hash over ordered field elements
pub trait FieldHasher: Send + Sync {
    /// Hash an ordered list of elements. Order matters.
    fn hash_elements(&self, inputs: &[FieldElement]) -> FieldElement;

    /// Strategy identifier used in logs and diagnostics
    fn name(&self) -> &'static str;

    /// Two-element hash: `hash_elements([a, b])`
    fn combine(&self, a: &FieldElement, b: &FieldElement) -> FieldElement {
        self.hash_elements(&[*a, *b])
    }
}

impl<H: FieldHasher + ?Sized> FieldHasher for Arc<H> {
    fn hash_elements(&self, inputs: &[FieldElement]) -> FieldElement {
        (**self).hash_elements(inputs)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

impl<H: FieldHasher + ?Sized> FieldHasher for &H {
    fn hash_elements(&self, inputs: &[FieldElement]) -> FieldElement {
        (**self).hash_elements(inputs)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Sponge construction used by [`PoseidonHasher`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpongeVariant {
    /// Absorb all inputs followed by a `1` padding element
    #[default]
    OnElements,
    /// Absorb all inputs, no padding
    Unpadded,
}

impl SpongeVariant {
    pub const ALL: [Self; 2] = [Self::OnElements, Self::Unpadded];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnElements => "poseidon-on-elements",
            Self::Unpadded => "poseidon-unpadded",
        }
    }
}

impl fmt::Display for SpongeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpongeVariant {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "on-elements" | "poseidon-on-elements" => Ok(Self::OnElements),
            "unpadded" | "poseidon-unpadded" => Ok(Self::Unpadded),
            other => Err(format!("unknown sponge variant: {other}")),
        }
    }
}

/// Poseidon sponge over BLS12-381 Fr
#[derive(Clone)]
pub struct PoseidonHasher {
    config: Arc<PoseidonConfig<Fr>>,
    variant: SpongeVariant,
}

impl PoseidonHasher {
    pub fn new(variant: SpongeVariant) -> Self {
        Self {
            config: Arc::clone(&POSEIDON_CONFIG),
            variant,
        }
    }

    pub fn variant(&self) -> SpongeVariant {
        self.variant
    }
}

impl Default for PoseidonHasher {
    fn default() -> Self {
        Self::new(SpongeVariant::default())
    }
}

impl fmt::Debug for PoseidonHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoseidonHasher")
            .field("variant", &self.variant)
            .finish()
    }
}

impl FieldHasher for PoseidonHasher {
    fn hash_elements(&self, inputs: &[FieldElement]) -> FieldElement {
        let config: &PoseidonConfig<Fr> = &self.config;
        let mut sponge = PoseidonSponge::new(config);

        for input in inputs {
            sponge.absorb(&input.to_fr());
        }
        if self.variant == SpongeVariant::OnElements {
            sponge.absorb(&Fr::from(1u64));
        }

        let result: Fr = sponge.squeeze_field_elements(1)[0];
        FieldElement::from_fr(result)
    }

    fn name(&self) -> &'static str {
        self.variant.as_str()
    }
}

/// Poseidon configuration
///
/// Field: BLS12-381 Fr (255 bits)
/// Rate: 2, Capacity: 1
/// Rounds: 8 full, 57 partial, alpha 5
fn poseidon_config() -> PoseidonConfig<Fr> {
    let prime_bits: u64 = 255;
    let rate: usize = 2;
    let capacity: usize = 1;
    let full_rounds: u64 = 8;
    let partial_rounds: u64 = 57;
    let alpha: u64 = 5;
    let skip_matrices: u64 = 0;

    let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
        prime_bits,
        rate,
        full_rounds,
        partial_rounds,
        skip_matrices,
    );

    PoseidonConfig::new(
        full_rounds as usize,
        partial_rounds as usize,
        alpha,
        mds,
        ark,
        rate,
        capacity,
    )
}

// ============================================================================
// Conformance
// ============================================================================

/// A known input/output pair published by the verifying ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConformanceVector {
    #[serde(default)]
    pub label: Option<String>,
    pub inputs: Vec<FieldElement>,
    pub expected: FieldElement,
}

impl ConformanceVector {
    /// Record what `hasher` produces for `inputs`
    pub fn capture<H: FieldHasher + ?Sized>(hasher: &H, inputs: Vec<FieldElement>) -> Self {
        let expected = hasher.hash_elements(&inputs);
        Self {
            label: None,
            inputs,
            expected,
        }
    }
}

/// Parse a JSON array of conformance vectors
pub fn load_vectors(json: &str) -> Result<Vec<ConformanceVector>> {
    Ok(serde_json::from_str(json)?)
}

/// Check `hasher` against every vector, failing on the first disagreement.
///
/// An empty vector set is an error: an unchecked adapter must not pass.
pub fn check_conformance<H: FieldHasher + ?Sized>(
    hasher: &H,
    vectors: &[ConformanceVector],
) -> Result<()> {
    if vectors.is_empty() {
        return Err(PrivacyError::NoConformanceVectors);
    }

    for (index, vector) in vectors.iter().enumerate() {
        let actual = hasher.hash_elements(&vector.inputs);
        if actual != vector.expected {
            return Err(PrivacyError::HashMismatch {
                index,
                expected: vector.expected,
                actual,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fe(v: u64) -> FieldElement {
        FieldElement::from(v)
    }

    #[test]
    fn test_hash_deterministic() {
        let hasher = PoseidonHasher::default();
        let a = hasher.hash_elements(&[fe(1), fe(2), fe(3)]);
        let b = hasher.hash_elements(&[fe(1), fe(2), fe(3)]);
        assert_eq!(a, b, "same inputs should produce same hash");
    }

    #[test]
    fn test_combine_is_two_element_hash() {
        let hasher = PoseidonHasher::default();
        assert_eq!(
            hasher.combine(&fe(7), &fe(9)),
            hasher.hash_elements(&[fe(7), fe(9)])
        );
    }

    #[test]
    fn test_padding_separates_lengths() {
        let padded = PoseidonHasher::new(SpongeVariant::OnElements);
        assert_ne!(
            padded.hash_elements(&[fe(5)]),
            padded.hash_elements(&[fe(5), FieldElement::ZERO]),
            "padded sponge must be length-injective"
        );

        // The unpadded sponge cannot tell a trailing zero apart.
        let unpadded = PoseidonHasher::new(SpongeVariant::Unpadded);
        assert_eq!(
            unpadded.hash_elements(&[fe(5)]),
            unpadded.hash_elements(&[fe(5), FieldElement::ZERO]),
        );
    }

    #[test]
    fn test_variants_not_interchangeable() {
        let on_elements = PoseidonHasher::new(SpongeVariant::OnElements);
        let unpadded = PoseidonHasher::new(SpongeVariant::Unpadded);
        let inputs = [fe(0xee85), fe(0x4f1c)];

        assert_ne!(
            on_elements.hash_elements(&inputs),
            unpadded.hash_elements(&inputs)
        );
    }

    #[test]
    fn test_known_answers() {
        let on_elements = PoseidonHasher::new(SpongeVariant::OnElements);
        let unpadded = PoseidonHasher::new(SpongeVariant::Unpadded);
        let pair = [fe(1), fe(2)];

        assert_eq!(
            on_elements.hash_elements(&pair).to_hex(),
            "0x4975d99f9511f5a7dc5108db8e1949c6f136e0b4fdfe3e594c3af5315b2262da"
        );
        assert_eq!(
            unpadded.hash_elements(&pair).to_hex(),
            "0x51f3e312c95343a896cfd8945ea82ba956c1118ce9b9859b6ea56637b4b1ddc4"
        );
        assert_eq!(
            on_elements.hash_elements(&[fe(5)]).to_hex(),
            "0x321f89c65e3380726b50fa97935ca755d20fd434132036c7b61f666e74287826"
        );
        assert_eq!(
            unpadded.hash_elements(&[fe(5)]).to_hex(),
            "0x592381ea563ffbbf4b91baed09a996623e638cd5204a1bfa6bfa0f2c0df0f69d"
        );
    }

    #[test]
    fn test_conformance_against_pinned_vectors() {
        let json = r#"[
            {
                "label": "pair",
                "inputs": ["0x1", "0x2"],
                "expected": "0x4975d99f9511f5a7dc5108db8e1949c6f136e0b4fdfe3e594c3af5315b2262da"
            },
            {
                "label": "single",
                "inputs": ["0x5"],
                "expected": "0x321f89c65e3380726b50fa97935ca755d20fd434132036c7b61f666e74287826"
            }
        ]"#;
        let vectors = load_vectors(json).unwrap();

        check_conformance(&PoseidonHasher::new(SpongeVariant::OnElements), &vectors).unwrap();
        assert!(matches!(
            check_conformance(&PoseidonHasher::new(SpongeVariant::Unpadded), &vectors),
            Err(PrivacyError::HashMismatch { index: 0, .. })
        ));
    }

    #[test]
    fn test_conformance_passes_for_matching_hasher() {
        let hasher = PoseidonHasher::default();
        let vectors = vec![
            ConformanceVector::capture(&hasher, vec![fe(1), fe(2)]),
            ConformanceVector::capture(&hasher, vec![fe(3)]),
            ConformanceVector::capture(&hasher, vec![]),
        ];
        check_conformance(&hasher, &vectors).unwrap();
    }

    #[test]
    fn test_conformance_catches_wrong_variant() {
        let ledger_hasher = PoseidonHasher::new(SpongeVariant::OnElements);
        let vectors = vec![
            ConformanceVector::capture(&ledger_hasher, vec![fe(1), fe(2)]),
            ConformanceVector::capture(&ledger_hasher, vec![fe(4), fe(5)]),
        ];

        let wrong = PoseidonHasher::new(SpongeVariant::Unpadded);
        match check_conformance(&wrong, &vectors) {
            Err(PrivacyError::HashMismatch { index, .. }) => assert_eq!(index, 0),
            other => panic!("expected HashMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_conformance_requires_vectors() {
        let hasher = PoseidonHasher::default();
        assert!(matches!(
            check_conformance(&hasher, &[]),
            Err(PrivacyError::NoConformanceVectors)
        ));
    }

    #[test]
    fn test_load_vectors_json() {
        let json = r#"[
            {"label": "pair", "inputs": ["0x1", "0x2"], "expected": "0xabc"},
            {"inputs": [], "expected": "0x0"}
        ]"#;
        let vectors = load_vectors(json).unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].label.as_deref(), Some("pair"));
        assert_eq!(vectors[0].inputs, vec![fe(1), fe(2)]);
        assert!(vectors[1].label.is_none());
    }

    #[test]
    fn test_variant_parse() {
        assert_eq!(
            "on-elements".parse::<SpongeVariant>().unwrap(),
            SpongeVariant::OnElements
        );
        assert_eq!(
            "Poseidon-Unpadded".parse::<SpongeVariant>().unwrap(),
            SpongeVariant::Unpadded
        );
        assert!("sha256".parse::<SpongeVariant>().is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Property: hashing is order-sensitive for distinct inputs.
        #[test]
        fn prop_hash_order_matters(a in any::<u64>(), b in any::<u64>()) {
            prop_assume!(a != b);
            let hasher = PoseidonHasher::default();
            prop_assert_ne!(
                hasher.hash_elements(&[fe(a), fe(b)]),
                hasher.hash_elements(&[fe(b), fe(a)])
            );
        }
    }
}
