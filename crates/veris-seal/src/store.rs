//! Append-only seal store
//!
//! The durable form of the seal chain. Seals are referenced, never
//! mutated; the store indexes by id for chain walks and can be rebuilt
//! from its ledger export after a crash.

use crate::seal::MerkleSeal;
use parking_lot::RwLock;
use std::collections::HashMap;
use veris_core::{Result, SealId, VerisError};
use veris_journal::Ledger;

/// Append-only store of sealed records with chain queries
pub struct SealStore {
    ledger: Ledger<MerkleSeal>,
    index: RwLock<HashMap<SealId, u64>>,
}

impl SealStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            ledger: Ledger::new("seal-chain"),
            index: RwLock::new(HashMap::new()),
        }
    }

    /// Append a seal. Validates the schema and rejects duplicate ids.
    pub fn append(&self, seal: MerkleSeal) -> Result<()> {
        seal.validate()?;
        let mut index = self.index.write();
        if index.contains_key(&seal.seal_id) {
            return Err(VerisError::invariant(format!(
                "seal {} already stored",
                seal.seal_id
            )));
        }
        let seal_id = seal.seal_id;
        let seq = self.ledger.append(seal);
        index.insert(seal_id, seq);
        Ok(())
    }

    /// Look up a seal by id
    pub fn get(&self, seal_id: SealId) -> Option<MerkleSeal> {
        let seq = *self.index.read().get(&seal_id)?;
        self.ledger
            .entries()
            .into_iter()
            .find(|entry| entry.seq == seq)
            .map(|entry| entry.value)
    }

    /// Number of stored seals
    pub fn len(&self) -> usize {
        self.ledger.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.ledger.is_empty()
    }

    /// Walk the chain starting from `seal_id`, newest to oldest.
    ///
    /// Stops at the first seal whose predecessor is unknown; an unknown
    /// starting id yields an empty chain.
    pub fn chain(&self, seal_id: SealId) -> Vec<MerkleSeal> {
        let mut chain = Vec::new();
        let mut current = Some(seal_id);
        while let Some(id) = current {
            let Some(seal) = self.get(id) else {
                break;
            };
            current = seal.previous_seal_id;
            chain.push(seal);
        }
        chain
    }

    /// Export the chain ledger as JSON lines for persistence
    pub fn export(&self) -> Result<String> {
        self.ledger.export()
    }

    /// Rebuild a store from a ledger export
    pub fn import(lines: &str) -> Result<Self> {
        let ledger: Ledger<MerkleSeal> = Ledger::import("seal-chain", lines)?;
        let index = ledger
            .entries()
            .into_iter()
            .map(|entry| (entry.value.seal_id, entry.seq))
            .collect();
        Ok(Self {
            ledger,
            index: RwLock::new(index),
        })
    }
}

impl Default for SealStore {
    fn default() -> Self {
        Self::new()
    }
}
