//! Trust aggregation
//!
//! Converts a closed consensus record plus a node-trust map into a
//! per-seal trust score: the trust-weighted fraction of positive
//! verdicts, penalized by the severity of any conflict attached to the
//! seal, clamped to [0, 1]. History per seal is append-only; the
//! current score is the most recent record's score.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use veris_consensus::ConsensusRecord;
use veris_core::{
    now, tether_check, ConsensusId, ContractPath, NodeId, Result, SealId, Timestamp,
    TrustRecordId, VerisError, PHASE_VERIFICATION,
};
use veris_journal::Ledger;
use veris_seal::ConflictRecord;

/// Node trust assumed when the trust map has no entry for a node
pub const DEFAULT_NODE_TRUST: f64 = 0.5;

/// One node's contribution to a seal's trust score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightedResult {
    /// Voting node
    pub node_id: NodeId,
    /// The node's verdict
    pub verdict: bool,
    /// The node's trust at aggregation time
    pub node_trust: f64,
    /// verdict (as 0/1) times node trust
    pub weighted_result: f64,
}

/// Derived, immutable trust record for one seal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustRecord {
    /// Record identifier
    pub trust_record_id: TrustRecordId,
    /// The seal scored
    pub seal_id: SealId,
    /// The consensus record scored from
    pub consensus_id: ConsensusId,
    /// Final trust score in [0, 1], after any conflict penalty
    pub trust_score: f64,
    /// Per-node contributions
    pub weighted_results: Vec<WeightedResult>,
    /// Sum of participant trust
    pub total_weight: f64,
    /// Sum of positive participants' trust
    pub positive_weighted_sum: f64,
    /// Number of participants
    pub node_count: usize,
    /// Aggregation time
    pub timestamp: Timestamp,
    /// Contract version of the trust/boundary path
    pub contract_version: String,
    /// Phase id of the aggregation component
    pub phase_id: String,
}

impl TrustRecord {
    /// Schema check
    pub fn validate(&self) -> Result<()> {
        tether_check(
            ContractPath::TrustBoundary,
            &self.contract_version,
            &self.phase_id,
        )?;
        if !(0.0..=1.0).contains(&self.trust_score) {
            return Err(VerisError::schema(format!(
                "trust score {} outside [0, 1]",
                self.trust_score
            )));
        }
        if self.node_count != self.weighted_results.len() {
            return Err(VerisError::schema(
                "node count does not match weighted results",
            ));
        }
        Ok(())
    }

    /// Weighted mean of the 0/1 verdicts, before any conflict penalty
    pub fn weighted_mean(&self) -> f64 {
        if self.total_weight > 0.0 {
            self.positive_weighted_sum / self.total_weight
        } else {
            0.0
        }
    }
}

/// Confidence metrics over a trust record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceMetrics {
    /// agreement_ratio * (1 - variance)
    pub confidence: f64,
    /// Variance of the 0/1 verdicts around their weighted mean
    pub variance: f64,
    /// max(positives, negatives) / participants
    pub agreement_ratio: f64,
}

/// Per-seal trust summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustSummary {
    /// The seal queried
    pub seal_id: SealId,
    /// Current trust score (most recent record)
    pub trust_score: f64,
    /// Number of trust records for the seal
    pub verification_count: usize,
    /// Timestamp of the most recent record
    pub last_verified: Option<Timestamp>,
    /// Confidence metrics of the most recent record
    pub confidence: Option<ConfidenceMetrics>,
}

/// Aggregates consensus outcomes into seal trust scores
pub struct TrustAggregationService {
    records: RwLock<HashMap<TrustRecordId, TrustRecord>>,
    seal_scores: RwLock<HashMap<SealId, f64>>,
    history: Ledger<TrustRecord>,
}

impl TrustAggregationService {
    /// Create an empty service
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            seal_scores: RwLock::new(HashMap::new()),
            history: Ledger::new("seal-trust-history"),
        }
    }

    /// Aggregate a consensus record into a trust record.
    ///
    /// Nodes missing from the trust map default to 0.5. When the
    /// seal carries an actual conflict, its severity penalty is
    /// subtracted from the score before clamping.
    pub fn aggregate(
        &self,
        consensus: &ConsensusRecord,
        node_trust: &HashMap<NodeId, f64>,
        seal_conflict: Option<&ConflictRecord>,
    ) -> Result<TrustRecord> {
        consensus.validate()?;
        if consensus.participants.is_empty() {
            return Err(VerisError::schema(format!(
                "consensus {} has no participants to aggregate",
                consensus.consensus_id
            )));
        }

        let mut weighted_results = Vec::with_capacity(consensus.participants.len());
        let mut total_weight = 0.0;
        let mut positive_weighted_sum = 0.0;
        for participant in &consensus.participants {
            let trust = node_trust
                .get(&participant.node_id)
                .copied()
                .unwrap_or(DEFAULT_NODE_TRUST);
            let weighted = if participant.verdict { trust } else { 0.0 };
            weighted_results.push(WeightedResult {
                node_id: participant.node_id,
                verdict: participant.verdict,
                node_trust: trust,
                weighted_result: weighted,
            });
            total_weight += trust;
            positive_weighted_sum += weighted;
        }

        let mut trust_score = if total_weight > 0.0 {
            positive_weighted_sum / total_weight
        } else {
            0.0
        };
        if let Some(conflict) = seal_conflict {
            if conflict.is_conflict() {
                trust_score -= conflict.severity.trust_penalty();
            }
        }
        let trust_score = trust_score.clamp(0.0, 1.0);

        let record = TrustRecord {
            trust_record_id: TrustRecordId::new(),
            seal_id: consensus.seal_id,
            consensus_id: consensus.consensus_id,
            trust_score,
            weighted_results,
            total_weight,
            positive_weighted_sum,
            node_count: consensus.participants.len(),
            timestamp: now(),
            contract_version: ContractPath::TrustBoundary.version().to_string(),
            phase_id: PHASE_VERIFICATION.to_string(),
        };
        record.validate()?;

        self.records
            .write()
            .insert(record.trust_record_id, record.clone());
        self.seal_scores
            .write()
            .insert(record.seal_id, record.trust_score);
        self.history.append(record.clone());
        tracing::debug!(
            seal = %record.seal_id,
            trust = record.trust_score,
            nodes = record.node_count,
            "trust record aggregated"
        );
        Ok(record)
    }

    /// A trust record by id
    pub fn get(&self, trust_record_id: TrustRecordId) -> Option<TrustRecord> {
        self.records.read().get(&trust_record_id).cloned()
    }

    /// Current trust score for a seal; 0 when never aggregated
    pub fn seal_trust_score(&self, seal_id: SealId) -> f64 {
        self.seal_scores
            .read()
            .get(&seal_id)
            .copied()
            .unwrap_or(0.0)
    }

    /// Append-only trust history for a seal, oldest first
    pub fn seal_trust_history(&self, seal_id: SealId) -> Vec<TrustRecord> {
        self.history
            .filtered(|record| record.seal_id == seal_id)
            .into_iter()
            .map(|entry| entry.value)
            .collect()
    }

    /// Confidence metrics for a trust record
    pub fn confidence_metrics(&self, trust_record_id: TrustRecordId) -> Result<ConfidenceMetrics> {
        let records = self.records.read();
        let record = records.get(&trust_record_id).ok_or_else(|| {
            VerisError::not_found(format!("trust record {trust_record_id} not found"))
        })?;

        if record.weighted_results.is_empty() {
            return Ok(ConfidenceMetrics {
                confidence: 0.0,
                variance: 0.0,
                agreement_ratio: 0.0,
            });
        }

        let mean = record.weighted_mean();
        let variance = record
            .weighted_results
            .iter()
            .map(|result| {
                let value = if result.verdict { 1.0 } else { 0.0 };
                (value - mean).powi(2)
            })
            .sum::<f64>()
            / record.weighted_results.len() as f64;

        let positives = record
            .weighted_results
            .iter()
            .filter(|result| result.verdict)
            .count();
        let total = record.weighted_results.len();
        let agreement_ratio = positives.max(total - positives) as f64 / total as f64;

        Ok(ConfidenceMetrics {
            confidence: agreement_ratio * (1.0 - variance),
            variance,
            agreement_ratio,
        })
    }

    /// Trust summary for a seal
    pub fn trust_summary(&self, seal_id: SealId) -> TrustSummary {
        let history = self.seal_trust_history(seal_id);
        let Some(latest) = history.last() else {
            return TrustSummary {
                seal_id,
                trust_score: self.seal_trust_score(seal_id),
                verification_count: 0,
                last_verified: None,
                confidence: None,
            };
        };
        TrustSummary {
            seal_id,
            trust_score: self.seal_trust_score(seal_id),
            verification_count: history.len(),
            last_verified: Some(latest.timestamp),
            confidence: self.confidence_metrics(latest.trust_record_id).ok(),
        }
    }

    /// Seals whose current score is at or above a threshold
    pub fn high_trust_seals(&self, threshold: f64) -> Vec<SealId> {
        self.seal_scores
            .read()
            .iter()
            .filter(|(_, &score)| score >= threshold)
            .map(|(&seal_id, _)| seal_id)
            .collect()
    }

    /// Seals whose current score is at or below a threshold
    pub fn low_trust_seals(&self, threshold: f64) -> Vec<SealId> {
        self.seal_scores
            .read()
            .iter()
            .filter(|(_, &score)| score <= threshold)
            .map(|(&seal_id, _)| seal_id)
            .collect()
    }
}

impl Default for TrustAggregationService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veris_consensus::{ConsensusState, Participant};
    use veris_core::now;
    use veris_seal::ConflictDetector;

    fn consensus_with(verdicts_and_trust: &[(bool, f64)]) -> (ConsensusRecord, HashMap<NodeId, f64>) {
        let mut record = ConsensusRecord::new(SealId::new(), 0.67);
        let mut trust_map = HashMap::new();
        for &(verdict, trust) in verdicts_and_trust {
            let node_id = NodeId::new();
            record.participants.push(Participant {
                node_id,
                verdict,
                signature: vec![0x55; 64],
                timestamp: now(),
            });
            trust_map.insert(node_id, trust);
        }
        record.recompute();
        record.state = ConsensusState::Collecting;
        (record, trust_map)
    }

    #[test]
    fn weighted_score_matches_hand_computation() {
        // (0.9 + 0.9 + 0.8) / (0.9 + 0.9 + 0.8 + 0.6 + 0.5) = 2.6 / 3.7
        let (consensus, trust_map) = consensus_with(&[
            (true, 0.9),
            (true, 0.9),
            (true, 0.8),
            (false, 0.6),
            (false, 0.5),
        ]);
        let service = TrustAggregationService::new();
        let record = service.aggregate(&consensus, &trust_map, None).unwrap();

        assert!((record.total_weight - 3.7).abs() < 1e-9);
        assert!((record.positive_weighted_sum - 2.6).abs() < 1e-9);
        assert!((record.trust_score - 2.6 / 3.7).abs() < 1e-9);
        assert!((service.seal_trust_score(consensus.seal_id) - 2.6 / 3.7).abs() < 1e-9);
    }

    #[test]
    fn unanimous_trusted_nodes_score_one() {
        let (consensus, trust_map) =
            consensus_with(&[(true, 0.9), (true, 0.9), (true, 0.9)]);
        let service = TrustAggregationService::new();
        let record = service.aggregate(&consensus, &trust_map, None).unwrap();
        assert!((record.trust_score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_node_trust_defaults_to_half() {
        let (consensus, mut trust_map) = consensus_with(&[(true, 0.9), (true, 0.9)]);
        let unknown = consensus.participants[1].node_id;
        trust_map.remove(&unknown);

        let service = TrustAggregationService::new();
        let record = service.aggregate(&consensus, &trust_map, None).unwrap();
        let unknown_result = record
            .weighted_results
            .iter()
            .find(|result| result.node_id == unknown)
            .unwrap();
        assert!((unknown_result.node_trust - DEFAULT_NODE_TRUST).abs() < f64::EPSILON);
    }

    #[test]
    fn conflict_severity_penalizes_and_clamps() {
        let (consensus, trust_map) = consensus_with(&[(true, 0.9), (true, 0.9)]);
        let conflict = ConflictDetector::trust_threshold(0.3, 0.9, &["registry"]);
        let service = TrustAggregationService::new();
        let record = service
            .aggregate(&consensus, &trust_map, Some(&conflict))
            .unwrap();
        // 1.0 - 0.2 (medium)
        assert!((record.trust_score - 0.8).abs() < 1e-9);

        // A clean "none" record carries no penalty
        let clean = veris_seal::ConflictRecord::none();
        let record = service
            .aggregate(&consensus, &trust_map, Some(&clean))
            .unwrap();
        assert!((record.trust_score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn confidence_metrics_follow_agreement() {
        let (consensus, trust_map) =
            consensus_with(&[(true, 0.8), (true, 0.8), (true, 0.8), (false, 0.8)]);
        let service = TrustAggregationService::new();
        let record = service.aggregate(&consensus, &trust_map, None).unwrap();
        let metrics = service.confidence_metrics(record.trust_record_id).unwrap();

        assert!((metrics.agreement_ratio - 0.75).abs() < 1e-9);
        // mean = 0.75; variance = (3*(0.25)^2 + (0.75)^2) / 4 = 0.1875
        assert!((metrics.variance - 0.1875).abs() < 1e-9);
        assert!((metrics.confidence - 0.75 * (1.0 - 0.1875)).abs() < 1e-9);
    }

    #[test]
    fn history_is_append_only_and_current_is_latest() {
        let (first, trust_map) = consensus_with(&[(true, 0.9), (false, 0.9)]);
        let service = TrustAggregationService::new();
        service.aggregate(&first, &trust_map, None).unwrap();

        // A later consensus over the same seal with different verdicts
        let (mut second, second_trust) = consensus_with(&[(true, 0.9), (true, 0.9)]);
        second.seal_id = first.seal_id;
        service.aggregate(&second, &second_trust, None).unwrap();

        let history = service.seal_trust_history(first.seal_id);
        assert_eq!(history.len(), 2);
        assert!((service.seal_trust_score(first.seal_id) - 1.0).abs() < f64::EPSILON);

        let summary = service.trust_summary(first.seal_id);
        assert_eq!(summary.verification_count, 2);
        assert!(summary.confidence.is_some());
    }

    #[test]
    fn threshold_queries_partition_seals() {
        let service = TrustAggregationService::new();
        let (good, good_trust) = consensus_with(&[(true, 0.9), (true, 0.9)]);
        let (bad, bad_trust) = consensus_with(&[(false, 0.9), (false, 0.9)]);
        service.aggregate(&good, &good_trust, None).unwrap();
        service.aggregate(&bad, &bad_trust, None).unwrap();

        assert_eq!(service.high_trust_seals(0.8), vec![good.seal_id]);
        assert_eq!(service.low_trust_seals(0.3), vec![bad.seal_id]);
    }
}
