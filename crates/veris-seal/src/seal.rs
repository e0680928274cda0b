//! The Merkle seal record
//!
//! A seal attests to a batch of outputs: the Merkle root over their
//! canonical encodings, the per-entry leaf digests in sealing order,
//! tree metadata, conflict metadata, and the chain link to the previous
//! seal from the same generator.

use crate::conflict::ConflictRecord;
use serde::{Deserialize, Serialize};
use veris_core::{
    hash, tether_check, ContractPath, Hash32, MerkleTree, OutputId, Result, SealId, Timestamp,
    VerisError,
};

/// Codex clauses attached to every seal on this path
pub const SEAL_CODEX_CLAUSES: &[&str] = &["5.3", "11.0"];

/// Shape of the tree a seal was built from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeMeta {
    /// Number of leaves sealed
    pub leaf_count: u32,
    /// Levels from leaves to root inclusive
    pub height: u32,
    /// Hash algorithm; always "sha256"
    pub algorithm: String,
}

/// One sealed output: its id and leaf digest, in sealing order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedEntry {
    /// Id of the sealed output
    pub entry_id: OutputId,
    /// SHA-256 over the output's canonical encoding
    pub entry_hash: Hash32,
}

/// A Merkle-rooted, chain-linked attestation over a batch of outputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerkleSeal {
    /// Seal identifier
    pub seal_id: SealId,
    /// Merkle root over the sealed entries; the integrity anchor
    pub root_hash: Hash32,
    /// Sealing time
    pub timestamp: Timestamp,
    /// Chain link to the previous seal from the same generator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_seal_id: Option<SealId>,
    /// Conflict metadata; the explicit `none` record when clean
    pub conflict_meta: ConflictRecord,
    /// Tree shape
    pub tree_meta: TreeMeta,
    /// Per-output digests in sealing order
    pub sealed_entries: Vec<SealedEntry>,
    /// Codex clauses this seal is produced under
    pub codex_clauses: Vec<String>,
    /// Contract version of the seal/consensus path
    pub contract_version: String,
    /// Phase id of the sealing component
    pub phase_id: String,
}

impl MerkleSeal {
    /// Schema and integrity check.
    ///
    /// Recomputes the root from the sealed entry digests, so a seal
    /// whose entries were tampered with fails validation even without
    /// the original outputs.
    pub fn validate(&self) -> Result<()> {
        tether_check(
            ContractPath::SealConsensus,
            &self.contract_version,
            &self.phase_id,
        )?;

        if self.sealed_entries.is_empty() {
            return Err(VerisError::schema("seal has no sealed entries"));
        }
        if self.tree_meta.leaf_count as usize != self.sealed_entries.len() {
            return Err(VerisError::schema(format!(
                "tree metadata claims {} leaves but seal carries {} entries",
                self.tree_meta.leaf_count,
                self.sealed_entries.len()
            )));
        }
        if self.tree_meta.algorithm != hash::ALGORITHM {
            return Err(VerisError::schema(format!(
                "unsupported tree algorithm {}",
                self.tree_meta.algorithm
            )));
        }
        self.conflict_meta.validate()?;

        let recomputed = self.recompute_root()?;
        if recomputed != self.root_hash {
            return Err(VerisError::schema(format!(
                "root hash {} is not recomputable from sealed entries (got {recomputed})",
                self.root_hash
            )));
        }
        Ok(())
    }

    /// Rebuild the Merkle root from the sealed entry digests
    pub fn recompute_root(&self) -> Result<Hash32> {
        let leaves = self
            .sealed_entries
            .iter()
            .map(|entry| entry.entry_hash)
            .collect();
        MerkleTree::from_leaves(leaves).build()
    }

    /// Position of an entry in the sealed order, for proof generation
    pub fn entry_index(&self, entry_id: OutputId) -> Option<usize> {
        self.sealed_entries
            .iter()
            .position(|entry| entry.entry_id == entry_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veris_core::now;

    fn seal_over(hashes: &[Hash32]) -> MerkleSeal {
        let entries: Vec<SealedEntry> = hashes
            .iter()
            .map(|digest| SealedEntry {
                entry_id: OutputId::new(),
                entry_hash: *digest,
            })
            .collect();
        let mut tree = MerkleTree::from_leaves(hashes.to_vec());
        let root = tree.build().unwrap();
        MerkleSeal {
            seal_id: SealId::new(),
            root_hash: root,
            timestamp: now(),
            previous_seal_id: None,
            conflict_meta: ConflictRecord::none(),
            tree_meta: TreeMeta {
                leaf_count: hashes.len() as u32,
                height: tree.height() as u32,
                algorithm: hash::ALGORITHM.to_string(),
            },
            sealed_entries: entries,
            codex_clauses: SEAL_CODEX_CLAUSES.iter().map(|s| s.to_string()).collect(),
            contract_version: ContractPath::SealConsensus.version().to_string(),
            phase_id: veris_core::PHASE_SEALING.to_string(),
        }
    }

    #[test]
    fn valid_seal_passes() {
        let seal = seal_over(&[hash::hash(b"a"), hash::hash(b"b"), hash::hash(b"c")]);
        assert!(seal.validate().is_ok());
    }

    #[test]
    fn tampered_entry_fails_validation() {
        let mut seal = seal_over(&[hash::hash(b"a"), hash::hash(b"b")]);
        seal.sealed_entries[1].entry_hash = hash::hash(b"tampered");
        assert!(seal.validate().is_err());
    }

    #[test]
    fn wrong_leaf_count_fails_validation() {
        let mut seal = seal_over(&[hash::hash(b"a"), hash::hash(b"b")]);
        seal.tree_meta.leaf_count = 3;
        assert!(seal.validate().is_err());
    }

    #[test]
    fn wrong_contract_version_is_tether_failure() {
        let mut seal = seal_over(&[hash::hash(b"a")]);
        seal.contract_version = "v2025.05.19".to_string();
        let err = seal.validate().expect_err("must fail");
        assert_eq!(err.category(), "tether_failure");
    }
}
