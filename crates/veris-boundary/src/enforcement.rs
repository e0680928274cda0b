//! Boundary enforcement
//!
//! The single public predicate of the boundary layer:
//!
//! ```text
//! allow(source, operation, resource, required_trust) =
//!     effective_trust(source, self) >= required_trust / 100
//!   ∧ policy_allows(operation, resource)
//!   ∧ attestations_satisfy(requirements)
//! ```
//!
//! Effective trust is direct trust when an edge exists, propagated
//! trust otherwise. Every call - allow or deny - appends an entry to
//! the enforcement log. A deny is a normal outcome with a reason, not
//! an error.

use crate::attestation::AttestationVerifier;
use crate::policy::{EnforcementPolicy, PolicyFilter};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use veris_core::{now, InstanceId, LogEntryId, Result, Timestamp};
use veris_journal::Ledger;
use veris_trust::TrustPropagationEngine;

/// Outcome of one enforcement call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnforcementDecision {
    /// Whether the operation is allowed
    pub allowed: bool,
    /// Why, in operator-readable form
    pub reason: String,
    /// The log entry recording this decision
    pub log_id: LogEntryId,
}

/// One entry in the append-only enforcement log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnforcementLogEntry {
    /// Entry identifier
    pub log_id: LogEntryId,
    /// Requesting instance
    pub source: InstanceId,
    /// Enforcing instance
    pub target: InstanceId,
    /// Operation requested
    pub operation: String,
    /// Resource path requested
    pub resource_path: String,
    /// The decision
    pub allowed: bool,
    /// The reason recorded with the decision
    pub reason: String,
    /// Decision time
    pub timestamp: Timestamp,
}

/// Filter for enforcement log queries
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    /// Match this source instance
    pub source: Option<InstanceId>,
    /// Match this operation
    pub operation: Option<String>,
    /// Match this resource path
    pub resource_path: Option<String>,
    /// Match this decision
    pub allowed: Option<bool>,
}

/// Enforces trust, policy, and attestation requirements at the edge
pub struct EnforcementModule {
    instance_id: InstanceId,
    engine: Arc<TrustPropagationEngine>,
    attestations: Arc<dyn AttestationVerifier>,
    policies: RwLock<Vec<EnforcementPolicy>>,
    log: Ledger<EnforcementLogEntry>,
}

impl EnforcementModule {
    /// Create an enforcement module for this instance
    pub fn new(
        instance_id: InstanceId,
        engine: Arc<TrustPropagationEngine>,
        attestations: Arc<dyn AttestationVerifier>,
    ) -> Self {
        Self {
            instance_id,
            engine,
            attestations,
            policies: RwLock::new(Vec::new()),
            log: Ledger::new("enforcement-log"),
        }
    }

    /// Register an enforcement policy
    pub fn create_policy(&self, policy: EnforcementPolicy) -> Result<EnforcementPolicy> {
        policy.validate()?;
        self.policies.write().push(policy.clone());
        tracing::info!(policy = %policy.policy_id, pattern = %policy.resource_pattern, "enforcement policy created");
        Ok(policy)
    }

    /// Policies matching a filter
    pub fn policies(&self, filter: &PolicyFilter) -> Vec<EnforcementPolicy> {
        self.policies
            .read()
            .iter()
            .filter(|policy| filter.matches(policy))
            .cloned()
            .collect()
    }

    /// The enforcement predicate. Always logs, never errors.
    pub fn allow(
        &self,
        source: InstanceId,
        operation: &str,
        resource_path: &str,
        required_trust: u8,
    ) -> EnforcementDecision {
        let decision = self.decide(source, operation, resource_path, required_trust);
        let log_id = self.append_log(source, operation, resource_path, decision.0, &decision.1);
        EnforcementDecision {
            allowed: decision.0,
            reason: decision.1,
            log_id,
        }
    }

    /// Enforce an attestation requirement alone.
    ///
    /// Allowed iff the source holds at least one attestation of the
    /// required type that verifies.
    pub fn enforce_attestation(
        &self,
        source: InstanceId,
        attestation_type: &str,
        operation: &str,
        resource_path: &str,
    ) -> EnforcementDecision {
        let attestations = self.attestations.attestations_for(source, attestation_type);
        let (allowed, reason) = if attestations.is_empty() {
            (
                false,
                format!("required attestation {attestation_type} not found"),
            )
        } else if attestations
            .iter()
            .any(|attestation| self.attestations.verify(attestation.attestation_id))
        {
            (
                true,
                format!("required attestation {attestation_type} verified"),
            )
        } else {
            (
                false,
                format!("attestation {attestation_type} failed verification"),
            )
        };

        let log_id = self.append_log(source, operation, resource_path, allowed, &reason);
        EnforcementDecision {
            allowed,
            reason,
            log_id,
        }
    }

    /// Enforcement log entries matching a filter, oldest first
    pub fn logs(&self, filter: &LogFilter) -> Vec<EnforcementLogEntry> {
        self.log
            .filtered(|entry| {
                filter.source.map_or(true, |source| entry.source == source)
                    && filter
                        .operation
                        .as_deref()
                        .map_or(true, |operation| entry.operation == operation)
                    && filter
                        .resource_path
                        .as_deref()
                        .map_or(true, |path| entry.resource_path == path)
                    && filter.allowed.map_or(true, |allowed| entry.allowed == allowed)
            })
            .into_iter()
            .map(|entry| entry.value)
            .collect()
    }

    /// Export the enforcement log for persistence
    pub fn export_log(&self) -> Result<String> {
        self.log.export()
    }

    fn decide(
        &self,
        source: InstanceId,
        operation: &str,
        resource_path: &str,
        required_trust: u8,
    ) -> (bool, String) {
        // Trust gate: direct or propagated, against the caller's floor
        let (effective_trust, path) = self.engine.propagated_trust(source, self.instance_id);
        let required = f64::from(required_trust) / 100.0;
        if effective_trust < required {
            return (
                false,
                format!(
                    "insufficient trust: effective {effective_trust:.2} below required {required:.2}"
                ),
            );
        }

        // Policy gate: precedence resolves conflicts, deny over allow
        let policies = self.policies.read();
        let applicable: Vec<&EnforcementPolicy> = policies
            .iter()
            .filter(|policy| policy.matches_resource(resource_path))
            .collect();

        if !applicable.is_empty() {
            let top = applicable
                .iter()
                .map(|policy| policy.precedence)
                .max()
                .unwrap_or(0);
            let winners: Vec<&&EnforcementPolicy> = applicable
                .iter()
                .filter(|policy| policy.precedence == top)
                .collect();

            let allows = winners
                .iter()
                .filter(|policy| policy.allows_operation(operation))
                .count();
            let denies = winners.len() - allows;
            if allows > 0 && denies > 0 {
                // Equal precedence, conflicting verdicts: deny wins,
                // flagged for operator review
                tracing::warn!(
                    resource = resource_path,
                    operation,
                    precedence = top,
                    "policy tie at equal precedence, denying"
                );
            }
            if denies > 0 {
                return (
                    false,
                    format!("operation {operation} denied by policy at precedence {top}"),
                );
            }

            // The winning allow policies may demand more trust and
            // attestations than the caller's floor
            for policy in &winners {
                let policy_required = f64::from(policy.required_trust_level) / 100.0;
                if effective_trust < policy_required {
                    return (
                        false,
                        format!(
                            "policy {} requires trust {policy_required:.2}, effective {effective_trust:.2}",
                            policy.policy_id
                        ),
                    );
                }
                for attestation_type in &policy.required_attestation_types {
                    let held = self
                        .attestations
                        .attestations_for(source, attestation_type)
                        .iter()
                        .any(|attestation| self.attestations.verify(attestation.attestation_id));
                    if !held {
                        return (
                            false,
                            format!("missing required attestation: {attestation_type}"),
                        );
                    }
                }
            }
        }

        let via = if path.len() > 2 {
            format!(" via {} hop(s)", path.len() - 2)
        } else {
            String::new()
        };
        (
            true,
            format!("trust {effective_trust:.2} meets required {required:.2}{via}, policy allows"),
        )
    }

    fn append_log(
        &self,
        source: InstanceId,
        operation: &str,
        resource_path: &str,
        allowed: bool,
        reason: &str,
    ) -> LogEntryId {
        let entry = EnforcementLogEntry {
            log_id: LogEntryId::new(),
            source,
            target: self.instance_id,
            operation: operation.to_string(),
            resource_path: resource_path.to_string(),
            allowed,
            reason: reason.to_string(),
            timestamp: now(),
        };
        let log_id = entry.log_id;
        tracing::debug!(source = %source, operation, resource_path, allowed, reason, "enforcement decision");
        self.log.append(entry);
        log_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::InMemoryAttestations;
    use veris_core::PropagationConfig;
    use veris_trust::BoundaryManager;

    struct Fixture {
        module: EnforcementModule,
        attestations: Arc<InMemoryAttestations>,
        source: InstanceId,
        own: InstanceId,
    }

    fn fixture(trust_level: u8) -> Fixture {
        let source = InstanceId::new();
        let own = InstanceId::new();
        let boundaries = Arc::new(BoundaryManager::new());
        boundaries
            .create_boundary(source, own, trust_level, Vec::new())
            .unwrap();
        let engine = Arc::new(TrustPropagationEngine::new(
            boundaries,
            PropagationConfig::default(),
        ));
        let attestations = Arc::new(InMemoryAttestations::new());
        let module = EnforcementModule::new(
            own,
            engine,
            Arc::clone(&attestations) as Arc<dyn AttestationVerifier>,
        );
        Fixture {
            module,
            attestations,
            source,
            own,
        }
    }

    #[test]
    fn trust_gate_allows_and_denies() {
        let f = fixture(80);
        assert!(f.module.allow(f.source, "read", "/data/x", 70).allowed);
        let denied = f.module.allow(f.source, "read", "/data/x", 90);
        assert!(!denied.allowed);
        assert!(denied.reason.contains("insufficient trust"));
    }

    #[test]
    fn every_call_is_logged() {
        let f = fixture(80);
        f.module.allow(f.source, "read", "/data/x", 70);
        f.module.allow(f.source, "write", "/data/x", 95);

        let all = f.module.logs(&LogFilter::default());
        assert_eq!(all.len(), 2);
        let denied = f.module.logs(&LogFilter {
            allowed: Some(false),
            ..LogFilter::default()
        });
        assert_eq!(denied.len(), 1);
        assert_eq!(denied[0].operation, "write");
        assert_eq!(denied[0].target, f.own);
    }

    #[test]
    fn higher_precedence_wins() {
        let f = fixture(90);
        // Broad deny at low precedence, narrow allow at high precedence
        f.module
            .create_policy(EnforcementPolicy::new(
                "data_access",
                "/data/*",
                50,
                Vec::new(),
                vec!["list".to_string()],
                1,
            ))
            .unwrap();
        f.module
            .create_policy(EnforcementPolicy::new(
                "data_access",
                "/data/reports/*",
                50,
                Vec::new(),
                vec!["read".to_string()],
                10,
            ))
            .unwrap();

        assert!(f.module.allow(f.source, "read", "/data/reports/q3", 50).allowed);
        // Outside the high-precedence pattern the broad policy denies "read"
        assert!(!f.module.allow(f.source, "read", "/data/other", 50).allowed);
    }

    #[test]
    fn equal_precedence_denies_on_conflict() {
        let f = fixture(90);
        f.module
            .create_policy(EnforcementPolicy::new(
                "data_access",
                "/data/*",
                50,
                Vec::new(),
                vec!["read".to_string()],
                5,
            ))
            .unwrap();
        f.module
            .create_policy(EnforcementPolicy::new(
                "data_access",
                "/data/*",
                50,
                Vec::new(),
                vec!["list".to_string()],
                5,
            ))
            .unwrap();

        // One allows read, the other does not: deny over allow
        assert!(!f.module.allow(f.source, "read", "/data/x", 50).allowed);
    }

    #[test]
    fn policy_attestation_requirements_bind() {
        let f = fixture(90);
        f.module
            .create_policy(EnforcementPolicy::new(
                "data_access",
                "/secure/*",
                50,
                vec!["compliance".to_string()],
                vec!["read".to_string()],
                1,
            ))
            .unwrap();

        let denied = f.module.allow(f.source, "read", "/secure/ledger", 50);
        assert!(!denied.allowed);
        assert!(denied.reason.contains("compliance"));

        f.attestations.issue(f.source, f.own, "compliance");
        assert!(f.module.allow(f.source, "read", "/secure/ledger", 50).allowed);
    }

    #[test]
    fn attestation_requirement_stands_alone() {
        let f = fixture(90);
        let denied = f
            .module
            .enforce_attestation(f.source, "identity", "read", "/data/x");
        assert!(!denied.allowed);

        let attestation = f.attestations.issue(f.source, f.own, "identity");
        assert!(
            f.module
                .enforce_attestation(f.source, "identity", "read", "/data/x")
                .allowed
        );

        f.attestations.invalidate(attestation.attestation_id);
        let failed = f
            .module
            .enforce_attestation(f.source, "identity", "read", "/data/x");
        assert!(!failed.allowed);
        assert!(failed.reason.contains("failed verification"));
    }

    #[test]
    fn no_boundary_means_no_trust() {
        let f = fixture(80);
        let stranger = InstanceId::new();
        let denied = f.module.allow(stranger, "read", "/data/x", 10);
        assert!(!denied.allowed);
    }
}
