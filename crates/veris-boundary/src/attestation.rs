//! Attestations
//!
//! Attestation issuance and storage are external collaborators; the
//! boundary needs only to list a subject's attestations by type and
//! verify one by id. `InMemoryAttestations` is the reference
//! implementation used by tests and single-process deployments.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use veris_core::{now, AttestationId, InstanceId, Timestamp};

/// A claim about a subject instance, issued by another instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attestation {
    /// Attestation identifier
    pub attestation_id: AttestationId,
    /// The instance the claim is about
    pub subject: InstanceId,
    /// The issuing instance
    pub issuer: InstanceId,
    /// Attestation type tag (e.g. "identity", "compliance")
    pub attestation_type: String,
    /// Issue time
    pub issued_at: Timestamp,
}

/// External attestation service seam
pub trait AttestationVerifier: Send + Sync {
    /// A subject's attestations of a given type
    fn attestations_for(&self, subject: InstanceId, attestation_type: &str) -> Vec<Attestation>;

    /// Whether an attestation is currently valid
    fn verify(&self, attestation_id: AttestationId) -> bool;
}

/// Reference in-memory attestation store
#[derive(Debug, Default)]
pub struct InMemoryAttestations {
    attestations: RwLock<HashMap<AttestationId, (Attestation, bool)>>,
}

impl InMemoryAttestations {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a valid attestation
    pub fn issue(
        &self,
        subject: InstanceId,
        issuer: InstanceId,
        attestation_type: impl Into<String>,
    ) -> Attestation {
        let attestation = Attestation {
            attestation_id: AttestationId::new(),
            subject,
            issuer,
            attestation_type: attestation_type.into(),
            issued_at: now(),
        };
        self.attestations
            .write()
            .insert(attestation.attestation_id, (attestation.clone(), true));
        attestation
    }

    /// Invalidate an attestation
    pub fn invalidate(&self, attestation_id: AttestationId) {
        if let Some((_, valid)) = self.attestations.write().get_mut(&attestation_id) {
            *valid = false;
        }
    }
}

impl AttestationVerifier for InMemoryAttestations {
    fn attestations_for(&self, subject: InstanceId, attestation_type: &str) -> Vec<Attestation> {
        self.attestations
            .read()
            .values()
            .filter(|(attestation, _)| {
                attestation.subject == subject && attestation.attestation_type == attestation_type
            })
            .map(|(attestation, _)| attestation.clone())
            .collect()
    }

    fn verify(&self, attestation_id: AttestationId) -> bool {
        self.attestations
            .read()
            .get(&attestation_id)
            .map(|(_, valid)| *valid)
            .unwrap_or(false)
    }
}
