//! Trust boundaries
//!
//! A boundary is a directed trust relationship between two runtime
//! instances, carrying an integer trust level 0-100, supporting
//! attestations, and attached policies. The manager is the exclusive
//! owner of boundary records: the propagation engine reads and
//! requests mutations through this API but never holds the records.
//! Every mutation re-stamps the boundary's Merkle root over its
//! canonical form, so a tampered boundary is detectable at rest.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use veris_core::{
    canonical_bytes_excluding, hash, now, tether_check, AttestationId, BoundaryId, ContractPath,
    Hash32, InstanceId, PolicyId, Result, Timestamp, VerisError, PHASE_TRUST,
};

/// Boundary lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryStatus {
    /// In force; contributes an edge to the trust graph
    Active,
    /// Ended with an immutable reason; ignored by the graph
    Revoked,
}

/// A directed trust relationship between two instances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Boundary {
    /// Boundary identifier
    pub boundary_id: BoundaryId,
    /// Trusting instance
    pub source: InstanceId,
    /// Trusted instance
    pub target: InstanceId,
    /// Trust level, 0 (none) to 100 (full)
    pub trust_level: u8,
    /// Lifecycle status
    pub status: BoundaryStatus,
    /// Attached enforcement policies
    pub policies: Vec<PolicyId>,
    /// Attestations supporting the boundary
    pub attestations: Vec<AttestationId>,
    /// Merkle root over the canonical form, re-stamped per mutation
    pub merkle_root: Hash32,
    /// Immutable reason recorded at revocation
    pub revocation_reason: Option<String>,
    /// Creation time
    pub created_at: Timestamp,
    /// Last mutation time
    pub updated_at: Timestamp,
    /// Contract version of the trust/boundary path
    pub contract_version: String,
    /// Phase id of the boundary component
    pub phase_id: String,
}

impl Boundary {
    /// Schema check
    pub fn validate(&self) -> Result<()> {
        tether_check(
            ContractPath::TrustBoundary,
            &self.contract_version,
            &self.phase_id,
        )?;
        if self.source == self.target {
            return Err(VerisError::schema(format!(
                "boundary {} from an instance to itself",
                self.boundary_id
            )));
        }
        if self.trust_level > 100 {
            return Err(VerisError::schema(format!(
                "boundary {} trust level {} above 100",
                self.boundary_id, self.trust_level
            )));
        }
        if self.status == BoundaryStatus::Revoked && self.revocation_reason.is_none() {
            return Err(VerisError::schema(format!(
                "revoked boundary {} has no reason",
                self.boundary_id
            )));
        }
        Ok(())
    }

    /// Trust level as a graph edge weight in [0, 1]
    pub fn edge_weight(&self) -> f64 {
        f64::from(self.trust_level) / 100.0
    }

    fn stamp(&mut self) -> Result<()> {
        self.updated_at = now();
        // The root covers everything except itself
        let canonical = canonical_bytes_excluding(self, &["merkle_root"])?;
        self.merkle_root = hash::hash(&canonical);
        Ok(())
    }
}

/// Filter for boundary list queries
#[derive(Debug, Clone, Default)]
pub struct BoundaryFilter {
    /// Match this source instance
    pub source: Option<InstanceId>,
    /// Match this target instance
    pub target: Option<InstanceId>,
    /// Minimum trust level
    pub min_trust_level: Option<u8>,
    /// Match this status
    pub status: Option<BoundaryStatus>,
}

impl BoundaryFilter {
    fn matches(&self, boundary: &Boundary) -> bool {
        self.source.map_or(true, |source| boundary.source == source)
            && self.target.map_or(true, |target| boundary.target == target)
            && self
                .min_trust_level
                .map_or(true, |min| boundary.trust_level >= min)
            && self.status.map_or(true, |status| boundary.status == status)
    }
}

/// Exclusive owner of boundary records
#[derive(Debug, Default)]
pub struct BoundaryManager {
    boundaries: RwLock<HashMap<BoundaryId, Boundary>>,
}

impl BoundaryManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an active boundary
    pub fn create_boundary(
        &self,
        source: InstanceId,
        target: InstanceId,
        trust_level: u8,
        attestations: Vec<AttestationId>,
    ) -> Result<Boundary> {
        let timestamp = now();
        let mut boundary = Boundary {
            boundary_id: BoundaryId::new(),
            source,
            target,
            trust_level: trust_level.min(100),
            status: BoundaryStatus::Active,
            policies: Vec::new(),
            attestations,
            merkle_root: Hash32::default(),
            revocation_reason: None,
            created_at: timestamp,
            updated_at: timestamp,
            contract_version: ContractPath::TrustBoundary.version().to_string(),
            phase_id: PHASE_TRUST.to_string(),
        };
        boundary.stamp()?;
        boundary.validate()?;

        tracing::info!(
            boundary = %boundary.boundary_id,
            source = %source,
            target = %target,
            trust = boundary.trust_level,
            "boundary created"
        );
        self.boundaries
            .write()
            .insert(boundary.boundary_id, boundary.clone());
        Ok(boundary)
    }

    /// Set a boundary's trust level, clamped to [0, 100]
    pub fn update_trust(&self, boundary_id: BoundaryId, trust_level: u8) -> Result<Boundary> {
        self.mutate_active(boundary_id, |boundary| {
            boundary.trust_level = trust_level.min(100);
        })
    }

    /// Attach an enforcement policy to a boundary
    pub fn attach_policy(&self, boundary_id: BoundaryId, policy_id: PolicyId) -> Result<Boundary> {
        self.mutate_active(boundary_id, |boundary| {
            if !boundary.policies.contains(&policy_id) {
                boundary.policies.push(policy_id);
            }
        })
    }

    /// Record an attestation supporting a boundary
    pub fn add_attestation(
        &self,
        boundary_id: BoundaryId,
        attestation_id: AttestationId,
    ) -> Result<Boundary> {
        self.mutate_active(boundary_id, |boundary| {
            if !boundary.attestations.contains(&attestation_id) {
                boundary.attestations.push(attestation_id);
            }
        })
    }

    /// Revoke a boundary with an immutable reason
    pub fn revoke(&self, boundary_id: BoundaryId, reason: impl Into<String>) -> Result<Boundary> {
        let mut boundaries = self.boundaries.write();
        let boundary = boundaries
            .get_mut(&boundary_id)
            .ok_or_else(|| VerisError::not_found(format!("boundary {boundary_id} not found")))?;
        if boundary.status == BoundaryStatus::Revoked {
            return Err(VerisError::invariant(format!(
                "boundary {boundary_id} is already revoked"
            )));
        }
        boundary.status = BoundaryStatus::Revoked;
        boundary.revocation_reason = Some(reason.into());
        boundary.stamp()?;
        tracing::warn!(boundary = %boundary_id, "boundary revoked");
        Ok(boundary.clone())
    }

    /// A boundary by id
    pub fn get(&self, boundary_id: BoundaryId) -> Option<Boundary> {
        self.boundaries.read().get(&boundary_id).cloned()
    }

    /// Boundaries matching a filter
    pub fn list(&self, filter: &BoundaryFilter) -> Vec<Boundary> {
        self.boundaries
            .read()
            .values()
            .filter(|boundary| filter.matches(boundary))
            .cloned()
            .collect()
    }

    /// All active boundaries; the source of the trust graph
    pub fn list_active(&self) -> Vec<Boundary> {
        self.list(&BoundaryFilter {
            status: Some(BoundaryStatus::Active),
            ..BoundaryFilter::default()
        })
    }

    /// The active boundary from `source` to `target`, if one exists
    pub fn between(&self, source: InstanceId, target: InstanceId) -> Option<Boundary> {
        self.boundaries
            .read()
            .values()
            .find(|boundary| {
                boundary.status == BoundaryStatus::Active
                    && boundary.source == source
                    && boundary.target == target
            })
            .cloned()
    }

    fn mutate_active(
        &self,
        boundary_id: BoundaryId,
        mutate: impl FnOnce(&mut Boundary),
    ) -> Result<Boundary> {
        let mut boundaries = self.boundaries.write();
        let boundary = boundaries
            .get_mut(&boundary_id)
            .ok_or_else(|| VerisError::not_found(format!("boundary {boundary_id} not found")))?;
        if boundary.status != BoundaryStatus::Active {
            return Err(VerisError::invariant(format!(
                "boundary {boundary_id} is revoked and immutable"
            )));
        }
        mutate(boundary);
        boundary.stamp()?;
        boundary.validate()?;
        Ok(boundary.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_update() {
        let manager = BoundaryManager::new();
        let (a, b) = (InstanceId::new(), InstanceId::new());
        let boundary = manager.create_boundary(a, b, 80, Vec::new()).unwrap();
        assert_eq!(boundary.trust_level, 80);
        assert!((boundary.edge_weight() - 0.8).abs() < f64::EPSILON);

        let updated = manager.update_trust(boundary.boundary_id, 60).unwrap();
        assert_eq!(updated.trust_level, 60);
    }

    #[test]
    fn self_boundary_is_rejected() {
        let manager = BoundaryManager::new();
        let a = InstanceId::new();
        assert!(manager.create_boundary(a, a, 50, Vec::new()).is_err());
    }

    #[test]
    fn merkle_root_changes_with_mutation() {
        let manager = BoundaryManager::new();
        let boundary = manager
            .create_boundary(InstanceId::new(), InstanceId::new(), 70, Vec::new())
            .unwrap();
        let updated = manager.update_trust(boundary.boundary_id, 71).unwrap();
        assert_ne!(boundary.merkle_root, updated.merkle_root);
    }

    #[test]
    fn revoked_boundaries_are_immutable_and_inactive() {
        let manager = BoundaryManager::new();
        let (a, b) = (InstanceId::new(), InstanceId::new());
        let boundary = manager.create_boundary(a, b, 90, Vec::new()).unwrap();
        manager.revoke(boundary.boundary_id, "key compromise").unwrap();

        assert!(manager.update_trust(boundary.boundary_id, 10).is_err());
        assert!(manager.list_active().is_empty());
        assert!(manager.between(a, b).is_none());
        let revoked = manager.get(boundary.boundary_id).unwrap();
        assert_eq!(revoked.revocation_reason.as_deref(), Some("key compromise"));
    }

    #[test]
    fn filters_compose() {
        let manager = BoundaryManager::new();
        let (a, b, c) = (InstanceId::new(), InstanceId::new(), InstanceId::new());
        manager.create_boundary(a, b, 80, Vec::new()).unwrap();
        manager.create_boundary(a, c, 40, Vec::new()).unwrap();
        manager.create_boundary(b, c, 90, Vec::new()).unwrap();

        let from_a = manager.list(&BoundaryFilter {
            source: Some(a),
            ..BoundaryFilter::default()
        });
        assert_eq!(from_a.len(), 2);

        let trusted = manager.list(&BoundaryFilter {
            min_trust_level: Some(75),
            ..BoundaryFilter::default()
        });
        assert_eq!(trusted.len(), 2);
    }
}
