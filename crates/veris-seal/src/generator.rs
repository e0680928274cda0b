//! Seal generation and verification
//!
//! The generator's only mutable state is the id of the most recently
//! produced seal, used to populate the chain link. Concurrent seal
//! creation from one generator is disallowed by construction: creation
//! takes `&mut self`.

use crate::conflict::ConflictRecord;
use crate::output::Output;
use crate::seal::{MerkleSeal, SealedEntry, TreeMeta, SEAL_CODEX_CLAUSES};
use veris_core::{
    hash, now, tether_check, ContractPath, MerkleTree, Result, SealId, VerisError, PHASE_SEALING,
};

/// Produces chain-linked Merkle seals over output batches
#[derive(Debug)]
pub struct SealGenerator {
    contract_version: String,
    phase_id: String,
    previous_seal_id: Option<SealId>,
}

impl SealGenerator {
    /// Generator tethered to the current seal/consensus contract
    pub fn new() -> Self {
        Self::with_contract(ContractPath::SealConsensus.version(), PHASE_SEALING)
    }

    /// Generator with an explicit tether.
    ///
    /// The tether is checked at every seal creation, not here: a
    /// mismatched tether must surface as a fatal creation failure with
    /// a critical conflict recorded, never as a silently absent
    /// generator.
    pub fn with_contract(contract_version: impl Into<String>, phase_id: impl Into<String>) -> Self {
        Self {
            contract_version: contract_version.into(),
            phase_id: phase_id.into(),
            previous_seal_id: None,
        }
    }

    /// Id of the most recently produced seal, if any
    pub fn previous_seal_id(&self) -> Option<SealId> {
        self.previous_seal_id
    }

    /// Create a seal over a batch of outputs.
    ///
    /// Fatal (not retried): an empty batch, a malformed output, a
    /// malformed conflict record, or a tether mismatch. The chain
    /// pointer advances only after the seal validates.
    pub fn create_seal(
        &mut self,
        outputs: &[Output],
        conflict: Option<ConflictRecord>,
    ) -> Result<MerkleSeal> {
        tether_check(
            ContractPath::SealConsensus,
            &self.contract_version,
            &self.phase_id,
        )?;

        if outputs.is_empty() {
            return Err(VerisError::schema("cannot seal an empty output batch"));
        }

        let conflict_meta = match conflict {
            Some(record) => {
                record.validate()?;
                record
            }
            None => ConflictRecord::none(),
        };

        let mut tree = MerkleTree::new();
        let mut sealed_entries = Vec::with_capacity(outputs.len());
        for output in outputs {
            output.validate()?;
            let entry_hash = tree.add_leaf(&output.canonical_bytes()?);
            sealed_entries.push(SealedEntry {
                entry_id: output.id,
                entry_hash,
            });
        }
        let root_hash = tree.build()?;

        let seal = MerkleSeal {
            seal_id: SealId::new(),
            root_hash,
            timestamp: now(),
            previous_seal_id: self.previous_seal_id,
            conflict_meta,
            tree_meta: TreeMeta {
                leaf_count: tree.leaf_count() as u32,
                height: tree.height() as u32,
                algorithm: hash::ALGORITHM.to_string(),
            },
            sealed_entries,
            codex_clauses: SEAL_CODEX_CLAUSES.iter().map(|s| s.to_string()).collect(),
            contract_version: self.contract_version.clone(),
            phase_id: self.phase_id.clone(),
        };
        seal.validate()?;

        self.previous_seal_id = Some(seal.seal_id);
        tracing::debug!(
            seal = %seal.seal_id,
            entries = seal.sealed_entries.len(),
            previous = ?seal.previous_seal_id,
            "seal created"
        );
        Ok(seal)
    }

    /// Verify a seal.
    ///
    /// True iff the seal validates against its schema and, when the
    /// outputs are supplied, rebuilding their Merkle root yields the
    /// seal's root hash.
    pub fn verify_seal(seal: &MerkleSeal, outputs: Option<&[Output]>) -> bool {
        if seal.validate().is_err() {
            return false;
        }
        let Some(outputs) = outputs else {
            return true;
        };

        let mut tree = MerkleTree::new();
        for output in outputs {
            let Ok(canonical) = output.canonical_bytes() else {
                return false;
            };
            tree.add_leaf(&canonical);
        }
        match tree.build() {
            Ok(root) => root == seal.root_hash,
            Err(_) => false,
        }
    }

    /// Verify a chain of seals in creation order (oldest first).
    ///
    /// Every seal after the first must link to its predecessor, and
    /// every seal must validate.
    pub fn verify_chain(seals: &[MerkleSeal]) -> bool {
        for window in seals.windows(2) {
            if window[1].previous_seal_id != Some(window[0].seal_id) {
                return false;
            }
        }
        seals.iter().all(|seal| seal.validate().is_ok())
    }
}

impl Default for SealGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outputs(n: usize) -> Vec<Output> {
        (0..n)
            .map(|i| Output::new("log", format!("payload-{i}").into_bytes(), json!({})))
            .collect()
    }

    #[test]
    fn seal_verifies_against_its_outputs() {
        let mut generator = SealGenerator::new();
        let outs = outputs(3);
        let seal = generator.create_seal(&outs, None).unwrap();
        assert!(SealGenerator::verify_seal(&seal, Some(&outs)));
        assert!(SealGenerator::verify_seal(&seal, None));
    }

    #[test]
    fn different_outputs_fail_verification() {
        let mut generator = SealGenerator::new();
        let seal = generator.create_seal(&outputs(3), None).unwrap();
        assert!(!SealGenerator::verify_seal(&seal, Some(&outputs(3))));
    }

    #[test]
    fn seals_chain_in_creation_order() {
        let mut generator = SealGenerator::new();
        let first = generator.create_seal(&outputs(1), None).unwrap();
        let second = generator.create_seal(&outputs(2), None).unwrap();
        let third = generator.create_seal(&outputs(1), None).unwrap();

        assert_eq!(first.previous_seal_id, None);
        assert_eq!(second.previous_seal_id, Some(first.seal_id));
        assert_eq!(third.previous_seal_id, Some(second.seal_id));
        assert!(SealGenerator::verify_chain(&[first, second, third]));
    }

    #[test]
    fn broken_chain_fails_verification() {
        let mut generator = SealGenerator::new();
        let first = generator.create_seal(&outputs(1), None).unwrap();
        let _skipped = generator.create_seal(&outputs(1), None).unwrap();
        let third = generator.create_seal(&outputs(1), None).unwrap();
        assert!(!SealGenerator::verify_chain(&[first, third]));
    }

    #[test]
    fn empty_batch_is_fatal() {
        let mut generator = SealGenerator::new();
        assert!(generator.create_seal(&[], None).is_err());
        assert_eq!(generator.previous_seal_id(), None);
    }

    #[test]
    fn unsupported_contract_version_blocks_output() {
        // Neither contract path supports v2025.05.19
        let mut generator = SealGenerator::with_contract("v2025.05.19", PHASE_SEALING);
        let err = generator
            .create_seal(&outputs(1), None)
            .expect_err("tether must fail");
        assert_eq!(err.category(), "tether_failure");
        // The chain pointer never moved
        assert_eq!(generator.previous_seal_id(), None);
    }

    #[test]
    fn malformed_output_is_fatal() {
        let mut generator = SealGenerator::new();
        let bad = Output::new("", vec![], json!({}));
        assert!(generator.create_seal(&[bad], None).is_err());
        assert_eq!(generator.previous_seal_id(), None);
    }
}
