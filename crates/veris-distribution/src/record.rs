//! Distribution records
//!
//! A distribution record tracks one seal's journey to a target node
//! set. Statuses are enumerated, not boolean flags; the terminal
//! status derives only from the per-target delivery results at the end
//! of a distribute call. Receipts are advisory bookkeeping from the
//! transport and never drive status.

use serde::{Deserialize, Serialize};
use veris_core::{now, DistributionId, NodeId, Result, SealId, Timestamp, VerisError};

/// Lowest accepted distribution priority
pub const MIN_PRIORITY: u8 = 1;
/// Highest accepted distribution priority
pub const MAX_PRIORITY: u8 = 5;

/// Distribution lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionStatus {
    /// Waiting in the queue
    Queued,
    /// Selected for delivery; attempts in flight
    Distributing,
    /// Every target succeeded; record moved to history
    Distributed,
    /// Some targets succeeded; remains queued for retry
    PartiallyDistributed,
    /// No target succeeded; remains queued for retry
    Failed,
}

/// Advisory receipt state reported by a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    /// No receipt yet
    Pending,
    /// Node acknowledged the seal
    Received,
    /// Node rejected the seal
    Rejected,
}

/// A node's receipt for one distribution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeReceipt {
    /// Reporting node
    pub node_id: NodeId,
    /// Receipt state
    pub status: ReceiptStatus,
    /// When the receipt was recorded
    pub timestamp: Timestamp,
    /// Free-form message from the node
    pub message: Option<String>,
}

/// One delivery attempt to one target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryAttempt {
    /// Target node
    pub node_id: NodeId,
    /// Whether the transport delivered within the timeout
    pub success: bool,
    /// Attempt time
    pub timestamp: Timestamp,
    /// Transport error when the attempt failed
    pub error: Option<String>,
}

/// Tracks one seal's distribution to a target node set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionRecord {
    /// Record identifier
    pub distribution_id: DistributionId,
    /// The seal being distributed
    pub seal_id: SealId,
    /// Priority in [1, 5]; 5 is most urgent
    pub priority: u8,
    /// Lifecycle status
    pub status: DistributionStatus,
    /// Targets of the most recent distribute call
    pub target_nodes: Vec<NodeId>,
    /// Advisory receipts, only for nodes in `target_nodes`
    pub node_receipts: Vec<NodeReceipt>,
    /// Results of the most recent delivery round
    pub deliveries: Vec<DeliveryAttempt>,
    /// Number of distribute calls made for this record
    pub retry_count: u32,
    /// When the record was queued
    pub created_at: Timestamp,
}

impl DistributionRecord {
    /// Create a freshly queued record
    pub fn queued(seal_id: SealId, priority: u8) -> Result<Self> {
        validate_priority(priority)?;
        Ok(Self {
            distribution_id: DistributionId::new(),
            seal_id,
            priority,
            status: DistributionStatus::Queued,
            target_nodes: Vec::new(),
            node_receipts: Vec::new(),
            deliveries: Vec::new(),
            retry_count: 0,
            created_at: now(),
        })
    }

    /// Whether the record is eligible for `retry_failed`
    pub fn needs_retry(&self) -> bool {
        matches!(
            self.status,
            DistributionStatus::Failed | DistributionStatus::PartiallyDistributed
        )
    }

    /// Derive the terminal status from a delivery round.
    ///
    /// All succeeded: distributed. Some: partially distributed.
    /// None: failed.
    pub fn derive_status(deliveries: &[DeliveryAttempt]) -> DistributionStatus {
        let successes = deliveries.iter().filter(|d| d.success).count();
        if successes == deliveries.len() && !deliveries.is_empty() {
            DistributionStatus::Distributed
        } else if successes > 0 {
            DistributionStatus::PartiallyDistributed
        } else {
            DistributionStatus::Failed
        }
    }

    /// Condensed view for status queries
    pub fn summary(&self) -> StatusSummary {
        StatusSummary {
            distribution_id: self.distribution_id,
            seal_id: self.seal_id,
            status: self.status,
            priority: self.priority,
            node_count: self.deliveries.len(),
            success_count: self.deliveries.iter().filter(|d| d.success).count(),
            retry_count: self.retry_count,
            created_at: self.created_at,
        }
    }
}

/// Condensed distribution status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSummary {
    /// Record identifier
    pub distribution_id: DistributionId,
    /// The seal being distributed
    pub seal_id: SealId,
    /// Lifecycle status
    pub status: DistributionStatus,
    /// Current priority
    pub priority: u8,
    /// Targets in the most recent round
    pub node_count: usize,
    /// Successful deliveries in the most recent round
    pub success_count: usize,
    /// Distribute calls made
    pub retry_count: u32,
    /// When the record was queued
    pub created_at: Timestamp,
}

/// Reject priorities outside [1, 5]
pub fn validate_priority(priority: u8) -> Result<()> {
    if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
        return Err(VerisError::schema(format!(
            "priority {priority} outside [{MIN_PRIORITY}, {MAX_PRIORITY}]"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(success: bool) -> DeliveryAttempt {
        DeliveryAttempt {
            node_id: NodeId::new(),
            success,
            timestamp: now(),
            error: (!success).then(|| "unreachable".to_string()),
        }
    }

    #[test]
    fn priority_bounds() {
        assert!(validate_priority(0).is_err());
        assert!(validate_priority(6).is_err());
        assert!(validate_priority(1).is_ok());
        assert!(validate_priority(5).is_ok());
    }

    #[test]
    fn status_derivation() {
        assert_eq!(
            DistributionRecord::derive_status(&[attempt(true), attempt(true)]),
            DistributionStatus::Distributed
        );
        assert_eq!(
            DistributionRecord::derive_status(&[attempt(true), attempt(false)]),
            DistributionStatus::PartiallyDistributed
        );
        assert_eq!(
            DistributionRecord::derive_status(&[attempt(false)]),
            DistributionStatus::Failed
        );
        assert_eq!(
            DistributionRecord::derive_status(&[]),
            DistributionStatus::Failed
        );
    }

    #[test]
    fn retry_eligibility() {
        let mut record = DistributionRecord::queued(SealId::new(), 3).unwrap();
        assert!(!record.needs_retry());
        record.status = DistributionStatus::Failed;
        assert!(record.needs_retry());
        record.status = DistributionStatus::PartiallyDistributed;
        assert!(record.needs_retry());
        record.status = DistributionStatus::Distributed;
        assert!(!record.needs_retry());
    }
}
