//! Threshold signature aggregation
//!
//! Tracks per-node signatures per message and, once the signature
//! count reaches `ceil(threshold * total_active_nodes)`, combines them
//! into a single threshold signature: the signatures are sorted,
//! concatenated, hashed with SHA-256, and base64-encoded. The same
//! input set always yields the same output regardless of submission
//! order, and fewer than threshold signatures cannot produce one.
//!
//! This is the reference construction, deliberately weak
//! cryptographically. Production deployments substitute BLS or FROST
//! behind the same combine/verify interface, and that substitution
//! requires operator sign-off.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use veris_core::{ConsensusId, NodeId};

#[derive(Debug, Default, Clone)]
struct SignatureSet {
    signatures: BTreeMap<NodeId, Vec<u8>>,
    threshold_signature: Option<String>,
}

/// Per-message signature tracking and combination
#[derive(Debug)]
pub struct ThresholdAggregator {
    threshold: f64,
    messages: HashMap<ConsensusId, SignatureSet>,
}

impl ThresholdAggregator {
    /// Create an aggregator with a threshold in (0.5, 1.0]
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            messages: HashMap::new(),
        }
    }

    /// Record a node's signature over a message.
    ///
    /// A node re-signing the same message replaces its previous
    /// signature; callers enforce at-most-once participation upstream.
    pub fn add_signature(&mut self, message_id: ConsensusId, node_id: NodeId, signature: Vec<u8>) {
        self.messages
            .entry(message_id)
            .or_default()
            .signatures
            .insert(node_id, signature);
    }

    /// Number of signatures required for a network of `total_nodes`
    pub fn required_count(&self, total_nodes: usize) -> usize {
        (self.threshold * total_nodes as f64).ceil() as usize
    }

    /// Whether the threshold has been reached for a message
    pub fn check_threshold(&self, message_id: ConsensusId, total_nodes: usize) -> bool {
        let Some(set) = self.messages.get(&message_id) else {
            return false;
        };
        total_nodes > 0 && set.signatures.len() >= self.required_count(total_nodes)
    }

    /// Combine the collected signatures if the threshold is reached.
    ///
    /// Deterministic: sorted signature values are concatenated, hashed
    /// with SHA-256, and base64-encoded. Returns the stored signature
    /// unchanged on repeat calls.
    pub fn combine(&mut self, message_id: ConsensusId, total_nodes: usize) -> Option<String> {
        if !self.check_threshold(message_id, total_nodes) {
            return None;
        }
        let set = self.messages.get_mut(&message_id)?;
        if let Some(existing) = &set.threshold_signature {
            return Some(existing.clone());
        }

        let mut sorted: Vec<&Vec<u8>> = set.signatures.values().collect();
        sorted.sort();
        let mut hasher = Sha256::new();
        for signature in sorted {
            hasher.update(signature);
        }
        let combined = STANDARD.encode(hasher.finalize());
        set.threshold_signature = Some(combined.clone());
        Some(combined)
    }

    /// The stored threshold signature for a message, if produced
    pub fn get(&self, message_id: ConsensusId) -> Option<String> {
        self.messages
            .get(&message_id)?
            .threshold_signature
            .clone()
    }

    /// Number of signatures collected for a message
    pub fn signature_count(&self, message_id: ConsensusId) -> usize {
        self.messages
            .get(&message_id)
            .map(|set| set.signatures.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_count_rounds_up() {
        let aggregator = ThresholdAggregator::new(0.67);
        assert_eq!(aggregator.required_count(3), 3); // ceil(2.01)
        assert_eq!(aggregator.required_count(5), 4); // ceil(3.35)
        assert_eq!(aggregator.required_count(10), 7); // ceil(6.7)
    }

    #[test]
    fn below_threshold_cannot_combine() {
        let mut aggregator = ThresholdAggregator::new(0.67);
        let message = ConsensusId::new();
        aggregator.add_signature(message, NodeId::new(), vec![1]);
        aggregator.add_signature(message, NodeId::new(), vec![2]);
        // 2 of 5 active nodes; requires 4
        assert!(!aggregator.check_threshold(message, 5));
        assert!(aggregator.combine(message, 5).is_none());
    }

    #[test]
    fn combine_is_permutation_invariant() {
        let signatures: Vec<Vec<u8>> = vec![vec![3, 3], vec![1, 1], vec![2, 2]];
        let nodes: Vec<NodeId> = (0..3).map(|_| NodeId::new()).collect();

        let forward = {
            let mut aggregator = ThresholdAggregator::new(0.67);
            let message = ConsensusId::new();
            for (node, signature) in nodes.iter().zip(&signatures) {
                aggregator.add_signature(message, *node, signature.clone());
            }
            aggregator.combine(message, 3).unwrap()
        };
        let reversed = {
            let mut aggregator = ThresholdAggregator::new(0.67);
            let message = ConsensusId::new();
            for (node, signature) in nodes.iter().rev().zip(signatures.iter().rev()) {
                aggregator.add_signature(message, *node, signature.clone());
            }
            aggregator.combine(message, 3).unwrap()
        };
        assert_eq!(forward, reversed);
    }

    #[test]
    fn combine_is_idempotent() {
        let mut aggregator = ThresholdAggregator::new(0.67);
        let message = ConsensusId::new();
        for i in 0..3u8 {
            aggregator.add_signature(message, NodeId::new(), vec![i; 8]);
        }
        let first = aggregator.combine(message, 3).unwrap();
        let second = aggregator.combine(message, 3).unwrap();
        assert_eq!(first, second);
        assert_eq!(aggregator.get(message), Some(first));
    }

    #[test]
    fn empty_network_never_reaches_threshold() {
        let aggregator = ThresholdAggregator::new(0.67);
        assert!(!aggregator.check_threshold(ConsensusId::new(), 0));
    }
}
