//! Conflict records and the conflict classifier
//!
//! The detector is a pure classifier: it takes the observed anomaly
//! and produces a normalized conflict record with a stable id, a
//! deduplicated affected-components list, and empty resolution state.
//! Absence of a conflict is encoded as the explicit `none` record.

use serde::{Deserialize, Serialize};
use veris_core::{
    now, tether_check, ConflictId, ContractPath, Result, Timestamp, VerisError, PHASE_SEALING,
};

/// Classified conflict types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// An output or record failed schema validation
    SchemaViolation,
    /// Observed trust fell below a required threshold
    TrustThreshold,
    /// Contract version or phase id mismatch
    TetherFailure,
    /// Attestation did not match its requirement (from enforcement)
    AttestationMismatch,
    /// A verifying node reported failure (from consensus)
    VerificationFailure,
    /// No conflict detected
    None,
}

/// Conflict severity; drives the trust-score penalty
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational
    Low,
    /// Degrades trust
    Medium,
    /// Strongly degrades trust
    High,
    /// Blocks output production
    Critical,
}

impl Severity {
    /// Trust-score penalty applied during aggregation
    pub fn trust_penalty(&self) -> f64 {
        match self {
            Self::Low => 0.1,
            Self::Medium => 0.2,
            Self::High => 0.4,
            Self::Critical => 0.6,
        }
    }
}

/// Resolution lifecycle of a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    /// Newly detected, nobody is working on it
    Unresolved,
    /// Resolution in progress
    Pending,
    /// Resolved, see arbitration metadata
    Resolved,
}

/// Whether arbitration is involved in resolving the conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArbitrationStatus {
    /// No arbitration needed
    NotRequired,
    /// Waiting on an arbiter
    Pending,
    /// Arbitration concluded
    Complete,
}

/// A typed seal-level conflict record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictRecord {
    /// Stable conflict identifier
    pub conflict_id: ConflictId,
    /// Classified conflict type
    pub conflict_type: ConflictType,
    /// Severity, drives trust penalties
    pub severity: Severity,
    /// Resolution lifecycle state
    pub resolution_status: ResolutionStatus,
    /// Evidence strings supporting the classification
    pub evidence: Vec<String>,
    /// Components affected, deduplicated and sorted
    pub affected_components: Vec<String>,
    /// Arbitration state
    pub arbitration_status: ArbitrationStatus,
    /// Detection time
    pub timestamp: Timestamp,
    /// Contract version of the seal/consensus path
    pub contract_version: String,
    /// Phase id of the detecting component
    pub phase_id: String,
}

impl ConflictRecord {
    /// The explicit "no conflict" record attached to clean seals
    pub fn none() -> Self {
        Self {
            conflict_id: ConflictId::new(),
            conflict_type: ConflictType::None,
            severity: Severity::Low,
            resolution_status: ResolutionStatus::Unresolved,
            evidence: Vec::new(),
            affected_components: Vec::new(),
            arbitration_status: ArbitrationStatus::NotRequired,
            timestamp: now(),
            contract_version: ContractPath::SealConsensus.version().to_string(),
            phase_id: PHASE_SEALING.to_string(),
        }
    }

    /// Whether this record represents an actual conflict
    pub fn is_conflict(&self) -> bool {
        self.conflict_type != ConflictType::None
    }

    /// Schema check
    pub fn validate(&self) -> Result<()> {
        tether_check(
            ContractPath::SealConsensus,
            &self.contract_version,
            &self.phase_id,
        )?;
        if self.conflict_type == ConflictType::None && !self.evidence.is_empty() {
            return Err(VerisError::schema(
                "a none conflict record cannot carry evidence",
            ));
        }
        Ok(())
    }
}

/// Pure classifier for seal-level anomalies
pub struct ConflictDetector;

impl ConflictDetector {
    /// An output or record failed schema validation. Severity high.
    pub fn schema_violation(evidence: Vec<String>, affected: &[&str]) -> ConflictRecord {
        Self::record(ConflictType::SchemaViolation, Severity::High, evidence, affected)
    }

    /// Observed trust below the required threshold. Severity medium.
    pub fn trust_threshold(observed: f64, required: f64, affected: &[&str]) -> ConflictRecord {
        Self::record(
            ConflictType::TrustThreshold,
            Severity::Medium,
            vec![format!("observed trust {observed} below required {required}")],
            affected,
        )
    }

    /// Contract version or phase id mismatch. Severity critical.
    pub fn tether_failure(
        contract_version: &str,
        phase_id: &str,
        affected: &[&str],
    ) -> ConflictRecord {
        Self::record(
            ConflictType::TetherFailure,
            Severity::Critical,
            vec![format!(
                "tether mismatch: contract_version={contract_version} phase_id={phase_id}"
            )],
            affected,
        )
    }

    /// Pass through a conflict produced upstream (consensus or
    /// enforcement), keeping its type and severity.
    pub fn passthrough(
        conflict_type: ConflictType,
        severity: Severity,
        evidence: Vec<String>,
        affected: &[&str],
    ) -> ConflictRecord {
        Self::record(conflict_type, severity, evidence, affected)
    }

    fn record(
        conflict_type: ConflictType,
        severity: Severity,
        evidence: Vec<String>,
        affected: &[&str],
    ) -> ConflictRecord {
        let mut affected_components: Vec<String> =
            affected.iter().map(|s| s.to_string()).collect();
        affected_components.sort();
        affected_components.dedup();

        ConflictRecord {
            conflict_id: ConflictId::new(),
            conflict_type,
            severity,
            resolution_status: ResolutionStatus::Unresolved,
            evidence,
            affected_components,
            arbitration_status: ArbitrationStatus::NotRequired,
            timestamp: now(),
            contract_version: ContractPath::SealConsensus.version().to_string(),
            phase_id: PHASE_SEALING.to_string(),
        }
    }
}
