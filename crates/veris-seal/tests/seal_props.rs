//! Property tests for seal creation, verification, and chaining.

#![allow(clippy::expect_used, missing_docs)]

use proptest::prelude::*;
use serde_json::json;
use veris_core::merkle::verify_proof;
use veris_core::MerkleTree;
use veris_seal::{Output, SealGenerator};

fn outputs_from(payloads: &[Vec<u8>]) -> Vec<Output> {
    payloads
        .iter()
        .map(|payload| Output::new("artifact", payload.clone(), json!({"source": "prop"})))
        .collect()
}

proptest! {
    // verify_seal(create_seal(outs), outs) = true for all non-empty outs
    #[test]
    fn created_seals_verify(payloads in proptest::collection::vec(
        proptest::collection::vec(any::<u8>(), 0..48), 1..12)
    ) {
        let mut generator = SealGenerator::new();
        let outs = outputs_from(&payloads);
        let seal = generator.create_seal(&outs, None).expect("non-empty batch");
        prop_assert!(SealGenerator::verify_seal(&seal, Some(&outs)));
        prop_assert_eq!(seal.recompute_root().expect("entries"), seal.root_hash);
    }

    // Sequential seals from one generator form an unbroken chain
    #[test]
    fn sequential_seals_chain(batches in proptest::collection::vec(
        proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..16), 1..4), 2..8)
    ) {
        let mut generator = SealGenerator::new();
        let seals: Vec<_> = batches
            .iter()
            .map(|payloads| {
                generator
                    .create_seal(&outputs_from(payloads), None)
                    .expect("non-empty batch")
            })
            .collect();

        for i in 1..seals.len() {
            prop_assert_eq!(seals[i].previous_seal_id, Some(seals[i - 1].seal_id));
        }
        prop_assert!(SealGenerator::verify_chain(&seals));
    }

    // Every sealed entry has a verifying inclusion proof
    #[test]
    fn sealed_entries_have_proofs(payloads in proptest::collection::vec(
        proptest::collection::vec(any::<u8>(), 0..32), 1..10)
    ) {
        let mut generator = SealGenerator::new();
        let outs = outputs_from(&payloads);
        let seal = generator.create_seal(&outs, None).expect("non-empty batch");

        let leaves: Vec<_> = seal.sealed_entries.iter().map(|entry| entry.entry_hash).collect();
        let mut tree = MerkleTree::from_leaves(leaves);
        let root = tree.build().expect("non-empty");
        prop_assert_eq!(root, seal.root_hash);

        for output in &outs {
            let index = seal.entry_index(output.id).expect("sealed");
            let proof = tree.proof(index).expect("in bounds");
            prop_assert!(verify_proof(seal.sealed_entries[index].entry_hash, &proof, root));
        }
    }
}
