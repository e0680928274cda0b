//! Consensus records
//!
//! One record collects the verdicts for one seal. States are
//! enumerated so the transition rules stay checkable:
//!
//! ```text
//! Created --add_result--> Collecting --threshold met--> Sealed
//!                             |
//!                             +--conflict detected--> Conflicted
//!                                                        |
//!                                               resolve--+--> Sealed | Conflicted
//! ```
//!
//! Each node appears at most once among the participants, and the
//! result is always exactly `positive_ratio >= threshold`.

use serde::{Deserialize, Serialize};
use veris_core::encoding::base64url;
use veris_core::{
    now, tether_check, ConsensusId, ContractPath, NodeId, Result, SealId, Timestamp, VerisError,
    PHASE_VERIFICATION,
};

/// Consensus record lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusState {
    /// No verdicts yet
    Created,
    /// Verdicts arriving, threshold not met
    Collecting,
    /// Threshold signature produced; verdicts are final
    Sealed,
    /// Disagreement detected; awaiting resolution
    Conflicted,
}

/// One node's verdict and signature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    /// Voting node
    pub node_id: NodeId,
    /// The node's verification verdict
    pub verdict: bool,
    /// Signature over the verdict, opaque to the core
    #[serde(with = "base64url")]
    pub signature: Vec<u8>,
    /// Submission time
    pub timestamp: Timestamp,
}

/// How a conflicted record was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    /// Simple majority of verdicts
    MajorityVote,
    /// Trust-weighted majority
    WeightedVote,
    /// An authority decided
    AuthorityDecision,
    /// No resolution chosen yet
    None,
}

/// Audit record of conflict detection and resolution.
///
/// Resolution never retroactively mutates the consensus result;
/// operators wanting override semantics run a new consensus round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictResolution {
    /// Whether a disagreement was detected
    pub conflict_detected: bool,
    /// Chosen resolution method
    pub resolution_method: ResolutionMethod,
    /// Operator-supplied details
    pub resolution_details: String,
}

impl ConflictResolution {
    /// A pending resolution, created when a conflict is first detected
    pub fn pending(details: impl Into<String>) -> Self {
        Self {
            conflict_detected: true,
            resolution_method: ResolutionMethod::None,
            resolution_details: details.into(),
        }
    }
}

/// The collected verdicts for one seal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusRecord {
    /// Record identifier
    pub consensus_id: ConsensusId,
    /// The seal under verification
    pub seal_id: SealId,
    /// Lifecycle state
    pub state: ConsensusState,
    /// Verdicts received, one per node
    pub participants: Vec<Participant>,
    /// Required positive ratio, in (0.5, 1.0]
    pub threshold: f64,
    /// Fraction of positive verdicts among participants
    pub positive_ratio: f64,
    /// Whether the positive ratio meets the threshold
    pub result: bool,
    /// Aggregated threshold signature, once enough of the active set
    /// has signed
    pub threshold_signature: Option<String>,
    /// Conflict detection and resolution audit record
    pub conflict_resolution: Option<ConflictResolution>,
    /// Record creation time
    pub created_at: Timestamp,
    /// Last mutation time
    pub updated_at: Timestamp,
    /// Contract version of the seal/consensus path
    pub contract_version: String,
    /// Phase id of the consensus component
    pub phase_id: String,
}

impl ConsensusRecord {
    /// Create an empty record for a seal
    pub fn new(seal_id: SealId, threshold: f64) -> Self {
        let timestamp = now();
        Self {
            consensus_id: ConsensusId::new(),
            seal_id,
            state: ConsensusState::Created,
            participants: Vec::new(),
            threshold,
            positive_ratio: 0.0,
            result: false,
            threshold_signature: None,
            conflict_resolution: None,
            created_at: timestamp,
            updated_at: timestamp,
            contract_version: ContractPath::SealConsensus.version().to_string(),
            phase_id: PHASE_VERIFICATION.to_string(),
        }
    }

    /// Whether a node has already submitted a verdict
    pub fn has_participant(&self, node_id: NodeId) -> bool {
        self.participants
            .iter()
            .any(|participant| participant.node_id == node_id)
    }

    /// Number of positive verdicts
    pub fn positives(&self) -> usize {
        self.participants
            .iter()
            .filter(|participant| participant.verdict)
            .count()
    }

    /// Recompute the positive ratio and result from the participants
    pub fn recompute(&mut self) {
        if self.participants.is_empty() {
            self.positive_ratio = 0.0;
            self.result = false;
            return;
        }
        self.positive_ratio = self.positives() as f64 / self.participants.len() as f64;
        self.result = self.positive_ratio >= self.threshold;
    }

    /// Whether the participants disagree (both verdicts present, at
    /// least two participants)
    pub fn has_disagreement(&self) -> bool {
        let positives = self.positives();
        self.participants.len() >= 2 && positives > 0 && positives < self.participants.len()
    }

    /// Schema and invariant check
    pub fn validate(&self) -> Result<()> {
        tether_check(
            ContractPath::SealConsensus,
            &self.contract_version,
            &self.phase_id,
        )?;
        if !(self.threshold > 0.5 && self.threshold <= 1.0) {
            return Err(VerisError::schema(format!(
                "consensus threshold {} outside (0.5, 1.0]",
                self.threshold
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for participant in &self.participants {
            if !seen.insert(participant.node_id) {
                return Err(VerisError::invariant(format!(
                    "node {} appears twice in consensus {}",
                    participant.node_id, self.consensus_id
                )));
            }
        }

        let expected = !self.participants.is_empty()
            && self.positive_ratio >= self.threshold;
        if self.result != expected {
            return Err(VerisError::invariant(format!(
                "consensus {} result {} does not match ratio {} vs threshold {}",
                self.consensus_id, self.result, self.positive_ratio, self.threshold
            )));
        }
        Ok(())
    }
}
