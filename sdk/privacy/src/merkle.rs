//! Merkle Engine for Note Commitments
//!
//! Deterministic binary tree over the ledger's leaf sequence, rebuilt from
//! scratch on every call. Nodes are combined in sorted order, so a proof needs
//! no left/right position bits.
//!
//! ```text
//!                 Root
//!                /    \
//!           S(C0,C1)   C2        S(a,b) = H(min(a,b), max(a,b))
//!            /   \      |
//!           C0   C1    C2        odd tail carried up unchanged
//! ```
//!
//! Equal children hash as `H(a, a)`; a tree with duplicate leaves is still well
//! defined, but lookup by value resolves to the first occurrence. Use
//! [`MerkleEngine::proof_at`] when the index is known.

use serde::{Deserialize, Serialize};

use crate::error::{PrivacyError, Result};
use crate::field::FieldElement;
use crate::hasher::FieldHasher;

/// An inclusion proof for one leaf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleProof {
    pub leaf: FieldElement,
    pub leaf_index: usize,
    /// Sibling hashes from leaf to root, odd-tail levels skipped
    pub siblings: Vec<FieldElement>,
}

/// Sorted-pair Merkle construction over an injected hasher
#[derive(Debug, Clone, Default)]
pub struct MerkleEngine<H> {
    hasher: H,
}

impl<H: FieldHasher> MerkleEngine<H> {
    pub fn new(hasher: H) -> Self {
        Self { hasher }
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Order-independent node combination
    pub fn combine_sorted(&self, a: &FieldElement, b: &FieldElement) -> FieldElement {
        if a < b {
            self.hasher.combine(a, b)
        } else {
            self.hasher.combine(b, a)
        }
    }

    /// All layers, leaves first. Empty input yields no layers.
    pub fn build_layers(&self, leaves: &[FieldElement]) -> Vec<Vec<FieldElement>> {
        if leaves.is_empty() {
            return Vec::new();
        }

        let mut layers = vec![leaves.to_vec()];
        while let Some(current) = layers.last() {
            if current.len() <= 1 {
                break;
            }
            let next = self.next_layer(current);
            layers.push(next);
        }
        layers
    }

    fn next_layer(&self, layer: &[FieldElement]) -> Vec<FieldElement> {
        layer
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => self.combine_sorted(left, right),
                [tail] => *tail,
                _ => unreachable!("chunks(2) yields one or two elements"),
            })
            .collect()
    }

    /// Root of the leaf sequence, `0x0` when there are no leaves
    pub fn root(&self, leaves: &[FieldElement]) -> FieldElement {
        self.tree(leaves).root()
    }

    /// Proof for the first leaf equal to `target`
    pub fn proof(&self, leaves: &[FieldElement], target: &FieldElement) -> Result<MerkleProof> {
        self.tree(leaves).proof_for(target)
    }

    /// Proof for the leaf at `index`
    pub fn proof_at(&self, leaves: &[FieldElement], index: usize) -> Result<MerkleProof> {
        self.tree(leaves).proof_at(index)
    }

    /// Build once, answer many proofs
    pub fn tree(&self, leaves: &[FieldElement]) -> MerkleTree {
        MerkleTree {
            layers: self.build_layers(leaves),
        }
    }

    /// Fold a leaf through its siblings
    pub fn compute_root_from_path(
        &self,
        leaf: &FieldElement,
        siblings: &[FieldElement],
    ) -> FieldElement {
        siblings
            .iter()
            .fold(*leaf, |current, sibling| self.combine_sorted(&current, sibling))
    }

    /// Check that `siblings` proves `leaf` under `root`
    pub fn verify(&self, leaf: &FieldElement, siblings: &[FieldElement], root: &FieldElement) -> bool {
        self.compute_root_from_path(leaf, siblings) == *root
    }
}

/// A built tree: layer 0 holds the leaves, the last layer holds the root
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MerkleTree {
    layers: Vec<Vec<FieldElement>>,
}

impl MerkleTree {
    pub fn root(&self) -> FieldElement {
        self.layers
            .last()
            .and_then(|top| top.first())
            .copied()
            .unwrap_or(FieldElement::ZERO)
    }

    pub fn layers(&self) -> &[Vec<FieldElement>] {
        &self.layers
    }

    pub fn leaves(&self) -> &[FieldElement] {
        self.layers.first().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().len()
    }

    pub fn position(&self, target: &FieldElement) -> Option<usize> {
        self.leaves().iter().position(|leaf| leaf == target)
    }

    pub fn proof_for(&self, target: &FieldElement) -> Result<MerkleProof> {
        let index = self
            .position(target)
            .ok_or(PrivacyError::LeafNotFound(*target))?;
        self.proof_at(index)
    }

    pub fn proof_at(&self, index: usize) -> Result<MerkleProof> {
        let leaf = *self
            .leaves()
            .get(index)
            .ok_or(PrivacyError::IndexOutOfBounds {
                index,
                len: self.leaf_count(),
            })?;

        let mut siblings = Vec::new();
        let mut idx = index;
        let below_root = self.layers.len().saturating_sub(1);
        for layer in &self.layers[..below_root] {
            if let Some(sibling) = layer.get(idx ^ 1) {
                siblings.push(*sibling);
            }
            idx /= 2;
        }

        Ok(MerkleProof {
            leaf,
            leaf_index: index,
            siblings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::{PoseidonHasher, SpongeVariant};
    use proptest::prelude::*;

    fn fe(v: u64) -> FieldElement {
        FieldElement::from(v)
    }

    fn engine() -> MerkleEngine<PoseidonHasher> {
        MerkleEngine::new(PoseidonHasher::default())
    }

    #[test]
    fn test_empty_tree() {
        let engine = engine();
        assert!(engine.build_layers(&[]).is_empty());
        assert_eq!(engine.root(&[]), FieldElement::ZERO);
        assert_eq!(engine.root(&[]).to_hex(), "0x0");
        assert!(matches!(
            engine.proof(&[], &fe(1)),
            Err(PrivacyError::LeafNotFound(_))
        ));
    }

    #[test]
    fn test_single_leaf_is_root() {
        let engine = engine();
        let leaf = FieldElement::from_hex("0xAB").unwrap();

        assert_eq!(engine.build_layers(&[leaf]), vec![vec![leaf]]);
        assert_eq!(engine.root(&[leaf]), leaf);

        let proof = engine.proof(&[leaf], &leaf).unwrap();
        assert!(proof.siblings.is_empty());
        assert!(engine.verify(&leaf, &proof.siblings, &leaf));
    }

    #[test]
    fn test_odd_tail_carried() {
        let engine = engine();
        let leaves = [fe(1), fe(2), fe(3)];
        let layers = engine.build_layers(&leaves);

        let h12 = engine.combine_sorted(&fe(1), &fe(2));
        assert_eq!(layers.len(), 3);
        assert_eq!(layers[1], vec![h12, fe(3)]);
        assert_eq!(engine.root(&leaves), engine.combine_sorted(&h12, &fe(3)));
    }

    #[test]
    fn test_known_root() {
        let leaves = [fe(1), fe(2), fe(3)];

        let tree = engine().tree(&leaves);
        assert_eq!(tree.layers().len(), 3);
        assert_eq!(tree.layers()[0], leaves.to_vec());
        assert_eq!(
            tree.layers()[1][0].to_hex(),
            "0x4975d99f9511f5a7dc5108db8e1949c6f136e0b4fdfe3e594c3af5315b2262da"
        );
        assert_eq!(
            tree.root().to_hex(),
            "0x52db479dd7eb79d3a268e628084d7256a1981c9be22c8be438ccc32895550c29"
        );

        let unpadded = MerkleEngine::new(PoseidonHasher::new(SpongeVariant::Unpadded));
        assert_eq!(
            unpadded.root(&leaves).to_hex(),
            "0x4d4110d5b13bc2d0e140fa248e5043d78f10a81984c023b2e5c4f001bf5aa951"
        );

        // Position does not matter, only value
        let reversed = [fe(2), fe(1), fe(3)];
        assert_eq!(engine().root(&reversed), tree.root());
    }

    #[test]
    fn test_proof_for_carried_leaf() {
        let engine = engine();
        let leaves = [fe(1), fe(2), fe(3)];
        let root = engine.root(&leaves);

        // 0x3 has no sibling at layer 0
        let proof = engine.proof(&leaves, &fe(3)).unwrap();
        assert_eq!(proof.siblings, vec![engine.combine_sorted(&fe(1), &fe(2))]);
        assert_eq!(proof.leaf_index, 2);
        assert!(engine.verify(&fe(3), &proof.siblings, &root));

        let proof = engine.proof(&leaves, &fe(1)).unwrap();
        assert_eq!(proof.siblings, vec![fe(2), fe(3)]);
        assert!(engine.verify(&fe(1), &proof.siblings, &root));
    }

    #[test]
    fn test_tampered_proof_rejected() {
        let engine = engine();
        let leaves: Vec<_> = (1..=5).map(fe).collect();
        let root = engine.root(&leaves);
        let mut proof = engine.proof(&leaves, &fe(4)).unwrap();

        assert!(!engine.verify(&fe(99), &proof.siblings, &root));
        proof.siblings[0] = fe(77);
        assert!(!engine.verify(&fe(4), &proof.siblings, &root));
    }

    #[test]
    fn test_missing_leaf_and_bad_index() {
        let engine = engine();
        let leaves = [fe(1), fe(2)];

        assert!(matches!(
            engine.proof(&leaves, &fe(9)),
            Err(PrivacyError::LeafNotFound(l)) if l == fe(9)
        ));
        assert!(matches!(
            engine.proof_at(&leaves, 2),
            Err(PrivacyError::IndexOutOfBounds { index: 2, len: 2 })
        ));
    }

    #[test]
    fn test_duplicate_leaves_resolve_first_match() {
        let engine = engine();
        let leaves = [fe(5), fe(6), fe(5), fe(7)];
        let root = engine.root(&leaves);

        let by_value = engine.proof(&leaves, &fe(5)).unwrap();
        assert_eq!(by_value.leaf_index, 0);

        let by_index = engine.proof_at(&leaves, 2).unwrap();
        assert_eq!(by_index.siblings[0], fe(7));
        assert!(engine.verify(&fe(5), &by_index.siblings, &root));
    }

    #[test]
    fn test_equal_children_hash_as_pair() {
        let engine = engine();
        let hasher = PoseidonHasher::default();
        assert_eq!(
            engine.combine_sorted(&fe(4), &fe(4)),
            hasher.hash_elements(&[fe(4), fe(4)])
        );
    }

    #[test]
    fn test_tree_shares_build() {
        let engine = engine();
        let leaves: Vec<_> = (10..17).map(fe).collect();
        let tree = engine.tree(&leaves);

        assert_eq!(tree.leaf_count(), 7);
        assert_eq!(tree.root(), engine.root(&leaves));
        for (i, leaf) in leaves.iter().enumerate() {
            let proof = tree.proof_at(i).unwrap();
            assert_eq!(proof, engine.proof(&leaves, leaf).unwrap());
            assert!(engine.verify(leaf, &proof.siblings, &tree.root()));
        }
    }

    #[test]
    fn test_proof_json_shape() {
        let engine = engine();
        let proof = engine.proof(&[fe(1), fe(2)], &fe(2)).unwrap();
        let value = serde_json::to_value(&proof).unwrap();

        assert_eq!(value["leaf"], "0x2");
        assert_eq!(value["leafIndex"], 1);
        assert_eq!(value["siblings"][0], "0x1");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        /// Property: every leaf's proof replays to the root.
        #[test]
        fn prop_every_proof_verifies(
            values in prop::collection::btree_set(any::<u64>(), 1..40)
                .prop_map(|set| set.into_iter().collect::<Vec<_>>())
                .prop_shuffle()
        ) {
            let engine = engine();
            let leaves: Vec<_> = values.into_iter().map(fe).collect();
            let tree = engine.tree(&leaves);
            let root = tree.root();

            for leaf in &leaves {
                let proof = tree.proof_for(leaf).unwrap();
                prop_assert!(engine.verify(leaf, &proof.siblings, &root));
            }
        }

        /// Property: sorted combination is symmetric.
        #[test]
        fn prop_combine_sorted_symmetric(a in any::<u64>(), b in any::<u64>()) {
            let engine = engine();
            prop_assert_eq!(
                engine.combine_sorted(&fe(a), &fe(b)),
                engine.combine_sorted(&fe(b), &fe(a))
            );
        }
    }
}
