//! Binary Merkle tree over SHA-256
//!
//! Leaves are digests of canonically-encoded outputs. Internal nodes
//! hash the concatenation of their two children in left-right order.
//! Levels with an odd node count duplicate the last node to pair
//! (Bitcoin-style), which keeps construction deterministic for any leaf
//! count. The root of an empty tree is undefined and surfaced as an
//! error. No timestamps or identifiers enter the hash: rebuilding from
//! the same leaf sequence always yields the same root.

use crate::errors::{Result, VerisError};
use crate::hash::{hash, Hash32};
use serde::{Deserialize, Serialize};

/// Maximum depth of a Merkle proof path (supports up to 2^32 leaves)
pub const MAX_MERKLE_DEPTH: u32 = 32;

/// Inclusion proof: sibling path from leaf to root plus the leaf
/// position needed to orient each step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Sibling digests from the leaf level upward
    pub sibling_path: Vec<Hash32>,
    /// Index of the proven leaf in the original sequence
    pub leaf_index: u32,
    /// Total number of leaves in the tree
    pub leaf_count: u32,
}

impl MerkleProof {
    /// Validate structural invariants after deserialization
    pub fn validate(&self) -> Result<()> {
        if self.sibling_path.len() > MAX_MERKLE_DEPTH as usize {
            return Err(VerisError::schema(format!(
                "proof path length {} exceeds maximum depth {}",
                self.sibling_path.len(),
                MAX_MERKLE_DEPTH
            )));
        }
        if self.leaf_count == 0 {
            return Err(VerisError::schema("proof over empty tree"));
        }
        if self.leaf_index >= self.leaf_count {
            return Err(VerisError::schema(format!(
                "leaf index {} out of bounds for {} leaves",
                self.leaf_index, self.leaf_count
            )));
        }
        Ok(())
    }
}

/// Deterministic binary hash tree over a leaf sequence
#[derive(Debug, Clone, Default)]
pub struct MerkleTree {
    leaves: Vec<Hash32>,
    levels: Vec<Vec<Hash32>>,
}

impl MerkleTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconstruct a tree from already-hashed leaves.
    ///
    /// Used to recompute a root from sealed entry digests without the
    /// original pre-images.
    pub fn from_leaves(leaves: Vec<Hash32>) -> Self {
        Self {
            leaves,
            levels: Vec::new(),
        }
    }

    /// Hash a canonically-encoded leaf and append it to the sequence.
    ///
    /// Invalidates any previously built levels; `build` must be called
    /// again before querying the root or proofs.
    pub fn add_leaf(&mut self, canonical: &[u8]) -> Hash32 {
        let leaf = hash(canonical);
        self.leaves.push(leaf);
        self.levels.clear();
        leaf
    }

    /// Number of leaves added so far
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Number of levels from leaves to root inclusive.
    ///
    /// Zero until `build` has run.
    pub fn height(&self) -> usize {
        self.levels.len()
    }

    /// Build the internal levels and return the root.
    ///
    /// Errors on an empty leaf sequence: the root of an empty tree is
    /// undefined.
    pub fn build(&mut self) -> Result<Hash32> {
        if self.leaves.is_empty() {
            return Err(VerisError::invariant(
                "merkle root undefined for empty tree",
            ));
        }

        self.levels = vec![self.leaves.clone()];
        while self.levels[self.levels.len() - 1].len() > 1 {
            let current = &self.levels[self.levels.len() - 1];
            let mut next = Vec::with_capacity(current.len().div_ceil(2));

            for pair in current.chunks(2) {
                let left = pair[0];
                // Odd level: duplicate the last node to pair it
                let right = if pair.len() == 2 { pair[1] } else { pair[0] };
                next.push(combine(left, right));
            }
            self.levels.push(next);
        }

        Ok(self.levels[self.levels.len() - 1][0])
    }

    /// Root of the built tree
    pub fn root(&self) -> Result<Hash32> {
        self.levels
            .last()
            .and_then(|level| level.first().copied())
            .ok_or_else(|| VerisError::invariant("tree not built"))
    }

    /// Inclusion proof for the leaf at `leaf_index`
    pub fn proof(&self, leaf_index: usize) -> Result<MerkleProof> {
        if self.levels.is_empty() {
            return Err(VerisError::invariant("tree not built"));
        }
        if leaf_index >= self.leaves.len() {
            return Err(VerisError::not_found(format!(
                "leaf index {} out of bounds for {} leaves",
                leaf_index,
                self.leaves.len()
            )));
        }

        let mut sibling_path = Vec::with_capacity(self.levels.len() - 1);
        let mut index = leaf_index;

        // All levels except the root contribute one sibling
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_index = index ^ 1;
            // Past the end means this node was duplicated to pair
            let sibling = if sibling_index < level.len() {
                level[sibling_index]
            } else {
                level[index]
            };
            sibling_path.push(sibling);
            index /= 2;
        }

        Ok(MerkleProof {
            sibling_path,
            leaf_index: leaf_index as u32,
            leaf_count: self.leaves.len() as u32,
        })
    }
}

fn combine(left: Hash32, right: Hash32) -> Hash32 {
    let mut concat = [0u8; 64];
    concat[..32].copy_from_slice(&left.0);
    concat[32..].copy_from_slice(&right.0);
    hash(&concat)
}

/// Verify an inclusion proof against a root.
///
/// `leaf` is the leaf digest (not the pre-image). Returns false for
/// structurally invalid proofs rather than erroring: callers treat a
/// bad proof and a failed proof identically.
pub fn verify_proof(leaf: Hash32, proof: &MerkleProof, root: Hash32) -> bool {
    if proof.validate().is_err() {
        return false;
    }

    let mut current = leaf;
    let mut index = proof.leaf_index as usize;

    for sibling in &proof.sibling_path {
        current = if index % 2 == 0 {
            combine(current, *sibling)
        } else {
            combine(*sibling, current)
        };
        index /= 2;
    }

    current == root
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_of(n: usize) -> MerkleTree {
        let mut tree = MerkleTree::new();
        for i in 0..n {
            tree.add_leaf(format!("leaf-{i}").as_bytes());
        }
        tree
    }

    #[test]
    fn empty_tree_has_no_root() {
        let mut tree = MerkleTree::new();
        assert!(tree.build().is_err());
    }

    #[test]
    fn single_leaf_root_is_leaf_hash() {
        let mut tree = MerkleTree::new();
        let leaf = tree.add_leaf(b"only");
        assert_eq!(tree.build().unwrap(), leaf);
    }

    #[test]
    fn rebuild_is_deterministic() {
        let root_a = tree_of(7).build().unwrap();
        let root_b = tree_of(7).build().unwrap();
        assert_eq!(root_a, root_b);
    }

    #[test]
    fn leaf_order_changes_root() {
        let mut forward = MerkleTree::new();
        forward.add_leaf(b"a");
        forward.add_leaf(b"b");
        let mut reversed = MerkleTree::new();
        reversed.add_leaf(b"b");
        reversed.add_leaf(b"a");
        assert_ne!(forward.build().unwrap(), reversed.build().unwrap());
    }

    #[test]
    fn odd_level_duplicates_last() {
        // Three leaves: root = H(H(l0||l1) || H(l2||l2))
        let mut tree = MerkleTree::new();
        let l0 = tree.add_leaf(b"0");
        let l1 = tree.add_leaf(b"1");
        let l2 = tree.add_leaf(b"2");
        let root = tree.build().unwrap();
        assert_eq!(root, combine(combine(l0, l1), combine(l2, l2)));
    }

    #[test]
    fn every_proof_verifies() {
        for n in 1..=9 {
            let mut tree = tree_of(n);
            let root = tree.build().unwrap();
            for i in 0..n {
                let leaf = hash(format!("leaf-{i}").as_bytes());
                let proof = tree.proof(i).unwrap();
                assert!(verify_proof(leaf, &proof, root), "n={n} i={i}");
            }
        }
    }

    #[test]
    fn wrong_leaf_fails_proof() {
        let mut tree = tree_of(5);
        let root = tree.build().unwrap();
        let proof = tree.proof(2).unwrap();
        assert!(!verify_proof(hash(b"not-a-leaf"), &proof, root));
    }

    #[test]
    fn proof_out_of_bounds_is_not_found() {
        let mut tree = tree_of(3);
        tree.build().unwrap();
        assert!(tree.proof(3).is_err());
    }
}
