//! Verification node records
//!
//! A node is uniquely bound to its public key at registration. Status
//! transitions are monotone toward revocation: active and degraded
//! interchange freely, revoked is terminal except for an explicit
//! operator reactivation.

use serde::{Deserialize, Serialize};
use veris_core::encoding::base64url;
use veris_core::{now, NodeId, Result, Timestamp, VerisError};

/// Role a node plays in the verification network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// Coordinates distribution rounds
    Coordinator,
    /// Verifies seals and submits verdicts
    Verifier,
    /// Receives seals without voting
    Observer,
}

/// Node lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// In the active set; receives seals and may vote
    Active,
    /// Temporarily unhealthy; excluded from default targets
    Degraded,
    /// Permanently excluded; retained for historical verification
    Revoked,
}

impl NodeStatus {
    /// Whether a normal (non-operator) transition to `next` is legal.
    ///
    /// Reactivation from revoked is operator-only and handled
    /// separately by the registry.
    pub fn can_transition_to(self, next: NodeStatus) -> bool {
        match (self, next) {
            (a, b) if a == b => true,
            (Self::Active, Self::Degraded) | (Self::Degraded, Self::Active) => true,
            (Self::Active, Self::Revoked) | (Self::Degraded, Self::Revoked) => true,
            (Self::Revoked, _) => false,
            _ => false,
        }
    }
}

/// A registered verification node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationNode {
    /// Node identifier, bound to the public key
    pub node_id: NodeId,
    /// Public key material, opaque to the registry
    #[serde(with = "base64url")]
    pub public_key: Vec<u8>,
    /// Network role
    pub role: NodeRole,
    /// Capability tags (e.g. "merkle_verification", "consensus")
    pub capabilities: Vec<String>,
    /// Lifecycle status
    pub status: NodeStatus,
    /// Trust score in [0, 1]; mutated only through the registry's
    /// trust API
    pub trust_score: f64,
    /// Reachable address for seal delivery
    pub network_address: String,
    /// Deployment region hint
    pub region: Option<String>,
    /// Registration time
    pub registered_at: Timestamp,
}

impl VerificationNode {
    /// Create an active node record ready for registration
    pub fn new(
        public_key: Vec<u8>,
        role: NodeRole,
        capabilities: Vec<String>,
        trust_score: f64,
        network_address: impl Into<String>,
    ) -> Self {
        Self {
            node_id: NodeId::new(),
            public_key,
            role,
            capabilities,
            status: NodeStatus::Active,
            trust_score: trust_score.clamp(0.0, 1.0),
            network_address: network_address.into(),
            region: None,
            registered_at: now(),
        }
    }

    /// Schema check
    pub fn validate(&self) -> Result<()> {
        if self.public_key.is_empty() {
            return Err(VerisError::schema(format!(
                "node {} has no public key",
                self.node_id
            )));
        }
        if self.network_address.is_empty() {
            return Err(VerisError::schema(format!(
                "node {} has no network address",
                self.node_id
            )));
        }
        if !(0.0..=1.0).contains(&self.trust_score) {
            return Err(VerisError::schema(format!(
                "node {} trust score {} outside [0, 1]",
                self.node_id, self.trust_score
            )));
        }
        Ok(())
    }

    /// Whether the node advertises a capability
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_are_monotone_toward_revocation() {
        use NodeStatus::*;
        assert!(Active.can_transition_to(Degraded));
        assert!(Degraded.can_transition_to(Active));
        assert!(Active.can_transition_to(Revoked));
        assert!(Degraded.can_transition_to(Revoked));
        assert!(!Revoked.can_transition_to(Active));
        assert!(!Revoked.can_transition_to(Degraded));
    }

    #[test]
    fn trust_is_clamped_at_construction() {
        let node = VerificationNode::new(vec![1], NodeRole::Verifier, vec![], 1.7, "tcp://n1");
        assert!((node.trust_score - 1.0).abs() < f64::EPSILON);
        let node = VerificationNode::new(vec![1], NodeRole::Verifier, vec![], -0.2, "tcp://n2");
        assert!(node.trust_score.abs() < f64::EPSILON);
    }

    #[test]
    fn missing_key_fails_validation() {
        let node = VerificationNode::new(vec![], NodeRole::Observer, vec![], 0.5, "tcp://n3");
        assert!(node.validate().is_err());
    }
}
