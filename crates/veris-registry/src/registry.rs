//! Node registry
//!
//! Single owner of verification-node records. Registration validates
//! the schema, rejects duplicate identities, and clamps trust into
//! [0, 1]. Trust mutation goes through `set_trust` - called by the
//! trust surface and operator attestation events, never derived here
//! from verification outcomes.

use crate::node::{NodeStatus, VerificationNode};
use parking_lot::RwLock;
use std::collections::HashMap;
use veris_core::{NodeId, Result, VerisError};

/// Registry of verification nodes
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: RwLock<HashMap<NodeId, VerificationNode>>,
}

impl NodeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node.
    ///
    /// Rejects duplicate node ids and duplicate public keys: node
    /// identity and key material are uniquely bound.
    pub fn register(&self, mut node: VerificationNode) -> Result<VerificationNode> {
        node.trust_score = node.trust_score.clamp(0.0, 1.0);
        node.validate()?;

        let mut nodes = self.nodes.write();
        if nodes.contains_key(&node.node_id) {
            return Err(VerisError::invariant(format!(
                "node {} already registered",
                node.node_id
            )));
        }
        if nodes
            .values()
            .any(|existing| existing.public_key == node.public_key)
        {
            return Err(VerisError::invariant(format!(
                "public key of node {} already bound to another node",
                node.node_id
            )));
        }

        tracing::info!(node = %node.node_id, role = ?node.role, "node registered");
        nodes.insert(node.node_id, node.clone());
        Ok(node)
    }

    /// Look up a node by id
    pub fn get(&self, node_id: NodeId) -> Option<VerificationNode> {
        self.nodes.read().get(&node_id).cloned()
    }

    /// Update a node's mutable fields.
    ///
    /// Applies role, capabilities, address, region, and status (with
    /// transition validation). The stored trust score is preserved:
    /// trust changes go through [`NodeRegistry::set_trust`].
    pub fn update(&self, node: VerificationNode) -> Result<VerificationNode> {
        node.validate()?;
        let mut nodes = self.nodes.write();
        let existing = nodes.get_mut(&node.node_id).ok_or_else(|| {
            VerisError::not_found(format!("node {} is not registered", node.node_id))
        })?;

        if node.public_key != existing.public_key {
            return Err(VerisError::invariant(format!(
                "node {} cannot change its public key",
                node.node_id
            )));
        }
        if !existing.status.can_transition_to(node.status) {
            return Err(VerisError::invariant(format!(
                "node {} transition {:?} -> {:?} is not allowed",
                node.node_id, existing.status, node.status
            )));
        }

        existing.role = node.role;
        existing.capabilities = node.capabilities;
        existing.network_address = node.network_address;
        existing.region = node.region;
        existing.status = node.status;
        Ok(existing.clone())
    }

    /// Change a node's status, validating the transition
    pub fn set_status(&self, node_id: NodeId, status: NodeStatus) -> Result<()> {
        let mut nodes = self.nodes.write();
        let node = nodes
            .get_mut(&node_id)
            .ok_or_else(|| VerisError::not_found(format!("node {node_id} is not registered")))?;
        if !node.status.can_transition_to(status) {
            return Err(VerisError::invariant(format!(
                "node {node_id} transition {:?} -> {status:?} is not allowed",
                node.status
            )));
        }
        tracing::info!(node = %node_id, from = ?node.status, to = ?status, "node status changed");
        node.status = status;
        Ok(())
    }

    /// Operator-initiated reactivation of a revoked node.
    ///
    /// The only path out of `Revoked`.
    pub fn reactivate(&self, node_id: NodeId, operator: &str) -> Result<()> {
        let mut nodes = self.nodes.write();
        let node = nodes
            .get_mut(&node_id)
            .ok_or_else(|| VerisError::not_found(format!("node {node_id} is not registered")))?;
        if node.status != NodeStatus::Revoked {
            return Err(VerisError::invariant(format!(
                "node {node_id} is {:?}, not revoked",
                node.status
            )));
        }
        tracing::warn!(node = %node_id, operator, "revoked node reactivated by operator");
        node.status = NodeStatus::Active;
        Ok(())
    }

    /// Set a node's trust score, clamped into [0, 1].
    ///
    /// Reserved for the trust surface and operator attestation events.
    pub fn set_trust(&self, node_id: NodeId, trust_score: f64, reason: &str) -> Result<f64> {
        let mut nodes = self.nodes.write();
        let node = nodes
            .get_mut(&node_id)
            .ok_or_else(|| VerisError::not_found(format!("node {node_id} is not registered")))?;
        let clamped = trust_score.clamp(0.0, 1.0);
        tracing::debug!(node = %node_id, trust = clamped, reason, "node trust updated");
        node.trust_score = clamped;
        Ok(clamped)
    }

    /// All nodes currently in the active set.
    ///
    /// Degraded and revoked nodes are excluded; revoked nodes remain
    /// registered for historical verification.
    pub fn active_nodes(&self) -> Vec<VerificationNode> {
        self.nodes
            .read()
            .values()
            .filter(|node| node.status == NodeStatus::Active)
            .cloned()
            .collect()
    }

    /// Nodes advertising a capability, regardless of status
    pub fn nodes_by_capability(&self, capability: &str) -> Vec<VerificationNode> {
        self.nodes
            .read()
            .values()
            .filter(|node| node.has_capability(capability))
            .cloned()
            .collect()
    }

    /// Trust scores for a set of nodes, for consensus weighting
    pub fn trust_scores(&self, node_ids: &[NodeId]) -> HashMap<NodeId, f64> {
        let nodes = self.nodes.read();
        node_ids
            .iter()
            .filter_map(|id| nodes.get(id).map(|node| (*id, node.trust_score)))
            .collect()
    }

    /// Number of registered nodes, all statuses
    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }
}
