//! The consensus service
//!
//! Owner of all consensus records. Verdict intake is serialized by the
//! service's lock, preserving the per-record invariants under
//! concurrent submission; across records no global ordering is
//! required or provided.

use crate::record::{
    ConflictResolution, ConsensusRecord, ConsensusState, Participant, ResolutionMethod,
};
use crate::threshold::ThresholdAggregator;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use veris_core::{now, ConsensusConfig, ConsensusId, NodeId, Result, SealId, VerisError};
use veris_registry::NodeRegistry;

/// Narrow query interface onto the node registry.
///
/// The consensus service needs only the size of the active set, to
/// size the threshold-signature quorum.
pub trait NodeDirectory: Send + Sync {
    /// Number of nodes currently in the active set
    fn active_node_count(&self) -> usize;
}

impl NodeDirectory for NodeRegistry {
    fn active_node_count(&self) -> usize {
        self.active_nodes().len()
    }
}

/// Reduction of a seal's consensus records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Latest consensus reached a positive result
    Verified,
    /// Latest consensus is in disagreement
    Conflict,
    /// Verdicts still arriving
    Pending,
    /// No consensus record exists for the seal
    NotVerified,
}

/// Per-seal verification status summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSummary {
    /// The seal queried
    pub seal_id: SealId,
    /// Reduced status
    pub status: VerificationStatus,
    /// Number of consensus records for the seal
    pub consensus_count: usize,
    /// The most recent consensus record, if any
    pub latest_consensus: Option<ConsensusId>,
}

struct Inner {
    records: HashMap<ConsensusId, ConsensusRecord>,
    aggregator: ThresholdAggregator,
}

/// Collects verdicts and forms consensus per seal
pub struct ConsensusService {
    config: ConsensusConfig,
    directory: Arc<dyn NodeDirectory>,
    inner: Mutex<Inner>,
}

impl ConsensusService {
    /// Create a service with the given threshold configuration
    pub fn new(config: ConsensusConfig, directory: Arc<dyn NodeDirectory>) -> Self {
        let aggregator = ThresholdAggregator::new(config.threshold);
        Self {
            config,
            directory,
            inner: Mutex::new(Inner {
                records: HashMap::new(),
                aggregator,
            }),
        }
    }

    /// Create an empty consensus record for a seal
    pub fn create(&self, seal_id: SealId) -> Result<ConsensusRecord> {
        let record = ConsensusRecord::new(seal_id, self.config.threshold);
        record.validate()?;
        let mut inner = self.inner.lock();
        inner.records.insert(record.consensus_id, record.clone());
        tracing::debug!(consensus = %record.consensus_id, seal = %seal_id, "consensus record created");
        Ok(record)
    }

    /// Record a node's verdict and signature.
    ///
    /// Double submission from a node is a fatal client error, and a
    /// verdict after the record is sealed is rejected. On success the
    /// positive ratio and result are recomputed, and the threshold
    /// signature is produced once enough of the active set has signed.
    pub fn add_result(
        &self,
        consensus_id: ConsensusId,
        node_id: NodeId,
        verdict: bool,
        signature: Vec<u8>,
    ) -> Result<ConsensusRecord> {
        let active_nodes = self.directory.active_node_count();
        let mut inner = self.inner.lock();
        let record = inner.records.get_mut(&consensus_id).ok_or_else(|| {
            VerisError::not_found(format!("consensus record {consensus_id} not found"))
        })?;

        if record.state == ConsensusState::Sealed {
            return Err(VerisError::invariant(format!(
                "consensus {consensus_id} is sealed; no further verdicts accepted"
            )));
        }
        if record.has_participant(node_id) {
            return Err(VerisError::invariant(format!(
                "node {node_id} has already participated in consensus {consensus_id}"
            )));
        }

        record.participants.push(Participant {
            node_id,
            verdict,
            signature: signature.clone(),
            timestamp: now(),
        });
        record.recompute();
        if record.state == ConsensusState::Created {
            record.state = ConsensusState::Collecting;
        }
        record.updated_at = now();
        record.validate()?;

        // Only endorsing verdicts contribute to the threshold
        // signature: the artifact certifies that a threshold fraction
        // of the active set endorsed the seal.
        if verdict {
            inner.aggregator.add_signature(consensus_id, node_id, signature);
            if let Some(threshold_signature) = inner.aggregator.combine(consensus_id, active_nodes)
            {
                let record = inner
                    .records
                    .get_mut(&consensus_id)
                    .ok_or_else(|| VerisError::internal("record vanished during aggregation"))?;
                record.threshold_signature = Some(threshold_signature);
                record.state = ConsensusState::Sealed;
                tracing::info!(
                    consensus = %consensus_id,
                    participants = record.participants.len(),
                    result = record.result,
                    "consensus sealed with threshold signature"
                );
            }
        }

        let record = inner
            .records
            .get(&consensus_id)
            .ok_or_else(|| VerisError::internal("record vanished"))?;
        Ok(record.clone())
    }

    /// Detect disagreement in a record.
    ///
    /// True iff at least two participants hold opposing verdicts. As a
    /// side effect, a pending conflict resolution is initialized when
    /// absent and the record transitions to conflicted.
    pub fn detect_conflicts(&self, consensus_id: ConsensusId) -> Result<bool> {
        let mut inner = self.inner.lock();
        let record = inner.records.get_mut(&consensus_id).ok_or_else(|| {
            VerisError::not_found(format!("consensus record {consensus_id} not found"))
        })?;

        if !record.has_disagreement() {
            return Ok(false);
        }
        if record.conflict_resolution.is_none() {
            record.conflict_resolution = Some(ConflictResolution::pending(
                "verification results in disagreement",
            ));
        }
        if record.state != ConsensusState::Sealed {
            record.state = ConsensusState::Conflicted;
        }
        record.updated_at = now();
        Ok(true)
    }

    /// Record a conflict resolution.
    ///
    /// The resolution is an audit record: it never mutates the
    /// consensus result. Resolving a record with no detected conflict
    /// is a no-op that returns the record with a synthesized pending
    /// resolution attached, leaving stored state untouched.
    pub fn resolve_conflict(
        &self,
        consensus_id: ConsensusId,
        method: ResolutionMethod,
        details: impl Into<String>,
    ) -> Result<ConsensusRecord> {
        let mut inner = self.inner.lock();
        let record = inner.records.get_mut(&consensus_id).ok_or_else(|| {
            VerisError::not_found(format!("consensus record {consensus_id} not found"))
        })?;

        let Some(resolution) = record.conflict_resolution.as_mut() else {
            let mut synthesized = record.clone();
            synthesized.conflict_resolution = Some(ConflictResolution::pending("no conflict detected"));
            return Ok(synthesized);
        };

        resolution.resolution_method = method;
        resolution.resolution_details = details.into();
        if record.threshold_signature.is_some() {
            record.state = ConsensusState::Sealed;
        }
        record.updated_at = now();
        tracing::info!(consensus = %consensus_id, ?method, "conflict resolution recorded");
        Ok(record.clone())
    }

    /// A consensus record by id
    pub fn get(&self, consensus_id: ConsensusId) -> Option<ConsensusRecord> {
        self.inner.lock().records.get(&consensus_id).cloned()
    }

    /// All consensus records for a seal
    pub fn by_seal(&self, seal_id: SealId) -> Vec<ConsensusRecord> {
        self.inner
            .lock()
            .records
            .values()
            .filter(|record| record.seal_id == seal_id)
            .cloned()
            .collect()
    }

    /// All consensus records
    pub fn all(&self) -> Vec<ConsensusRecord> {
        self.inner.lock().records.values().cloned().collect()
    }

    /// Reduce a seal's consensus records to a verification status.
    ///
    /// The status of the most recently updated record wins.
    pub fn verification_status(&self, seal_id: SealId) -> VerificationSummary {
        let records = self.by_seal(seal_id);
        let Some(latest) = records.iter().max_by_key(|record| record.updated_at) else {
            return VerificationSummary {
                seal_id,
                status: VerificationStatus::NotVerified,
                consensus_count: 0,
                latest_consensus: None,
            };
        };

        let status = if latest.result {
            VerificationStatus::Verified
        } else if latest.has_disagreement() {
            VerificationStatus::Conflict
        } else {
            VerificationStatus::Pending
        };

        VerificationSummary {
            seal_id,
            status,
            consensus_count: records.len(),
            latest_consensus: Some(latest.consensus_id),
        }
    }
}
