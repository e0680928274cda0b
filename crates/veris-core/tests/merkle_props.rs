//! Property tests for Merkle tree construction and proofs.

#![allow(clippy::expect_used, missing_docs)]

use proptest::prelude::*;
use veris_core::hash::hash;
use veris_core::merkle::{verify_proof, MerkleTree};

fn tree_from(leaves: &[Vec<u8>]) -> MerkleTree {
    let mut tree = MerkleTree::new();
    for leaf in leaves {
        tree.add_leaf(leaf);
    }
    tree
}

proptest! {
    #[test]
    fn rebuild_yields_same_root(leaves in proptest::collection::vec(
        proptest::collection::vec(any::<u8>(), 0..64), 1..32)
    ) {
        let root_a = tree_from(&leaves).build().expect("non-empty");
        let root_b = tree_from(&leaves).build().expect("non-empty");
        prop_assert_eq!(root_a, root_b);
    }

    #[test]
    fn all_proofs_verify(leaves in proptest::collection::vec(
        proptest::collection::vec(any::<u8>(), 0..64), 1..32)
    ) {
        let mut tree = tree_from(&leaves);
        let root = tree.build().expect("non-empty");
        for (i, leaf) in leaves.iter().enumerate() {
            let proof = tree.proof(i).expect("in bounds");
            prop_assert!(verify_proof(hash(leaf), &proof, root));
        }
    }

    #[test]
    fn proof_depth_is_logarithmic(leaves in proptest::collection::vec(
        proptest::collection::vec(any::<u8>(), 0..16), 1..64)
    ) {
        let mut tree = tree_from(&leaves);
        let root = tree.build().expect("non-empty");
        let expected_depth = (leaves.len() as f64).log2().ceil() as usize;
        let proof = tree.proof(0).expect("in bounds");
        prop_assert!(proof.sibling_path.len() <= expected_depth.max(1));
        prop_assert!(verify_proof(hash(&leaves[0]), &proof, root));
    }

    #[test]
    fn foreign_leaf_never_verifies(leaves in proptest::collection::vec(
        proptest::collection::vec(any::<u8>(), 1..32), 2..16)
    ) {
        let mut tree = tree_from(&leaves);
        let root = tree.build().expect("non-empty");
        let proof = tree.proof(0).expect("in bounds");
        // A leaf that was never added cannot satisfy a proof for index 0
        let foreign = hash(b"leaf that was never sealed");
        prop_assume!(foreign != hash(&leaves[0]));
        prop_assert!(!verify_proof(foreign, &proof, root));
    }
}
