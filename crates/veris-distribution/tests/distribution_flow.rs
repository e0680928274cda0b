//! Integration tests for the distribution service: priority ordering,
//! partial delivery, retry, and receipt tracking.

#![allow(clippy::expect_used, clippy::unwrap_used, missing_docs)]

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use veris_core::{DistributionConfig, NodeId, Result, VerisError};
use veris_distribution::{
    DistributionService, DistributionStatus, ReceiptStatus, SealTransport,
};
use veris_registry::{NodeRole, VerificationNode};
use veris_seal::{MerkleSeal, Output, SealGenerator};

/// Transport that fails deliveries to a configurable node set
struct FlakyTransport {
    unreachable: RwLock<HashSet<NodeId>>,
}

impl FlakyTransport {
    fn new() -> Self {
        Self {
            unreachable: RwLock::new(HashSet::new()),
        }
    }

    fn set_unreachable(&self, node_id: NodeId, down: bool) {
        if down {
            self.unreachable.write().insert(node_id);
        } else {
            self.unreachable.write().remove(&node_id);
        }
    }
}

#[async_trait]
impl SealTransport for FlakyTransport {
    async fn send_seal(&self, _seal: &MerkleSeal, node: &VerificationNode) -> Result<()> {
        if self.unreachable.read().contains(&node.node_id) {
            return Err(VerisError::transport(format!(
                "node {} unreachable",
                node.node_id
            )));
        }
        Ok(())
    }
}

fn verifier(key: u8) -> VerificationNode {
    VerificationNode::new(
        vec![key; 32],
        NodeRole::Verifier,
        vec!["merkle_verification".into()],
        0.9,
        format!("tcp://node-{key}"),
    )
}

fn sealed() -> MerkleSeal {
    let mut generator = SealGenerator::new();
    let outputs = vec![Output::new("log", b"payload".to_vec(), json!({}))];
    generator.create_seal(&outputs, None).unwrap()
}

fn service(transport: Arc<FlakyTransport>) -> DistributionService {
    DistributionService::new(transport, DistributionConfig::default())
}

#[tokio::test]
async fn full_distribution_moves_to_history() {
    let transport = Arc::new(FlakyTransport::new());
    let service = service(Arc::clone(&transport));
    let targets = vec![verifier(1), verifier(2), verifier(3)];

    let id = service.queue_seal(&sealed(), 3).unwrap();
    let record = service.distribute(id, &targets).await.unwrap();

    assert_eq!(record.status, DistributionStatus::Distributed);
    assert_eq!(record.retry_count, 1);
    // Record reached history and is no longer selectable
    assert_eq!(service.status(id).unwrap().status, DistributionStatus::Distributed);
    assert!(service.optimize_bandwidth(10).is_empty());
}

#[tokio::test]
async fn partial_distribution_stays_queued_then_retries() {
    let transport = Arc::new(FlakyTransport::new());
    let service = service(Arc::clone(&transport));
    let targets = vec![verifier(1), verifier(2), verifier(3)];
    transport.set_unreachable(targets[2].node_id, true);

    let id = service.queue_seal(&sealed(), 3).unwrap();
    let record = service.distribute(id, &targets).await.unwrap();
    assert_eq!(record.status, DistributionStatus::PartiallyDistributed);
    assert_eq!(record.retry_count, 1);

    // Node 3 comes back; retry completes the distribution
    transport.set_unreachable(targets[2].node_id, false);
    let retried = service.retry_failed(&targets).await.unwrap();
    assert_eq!(retried.len(), 1);
    assert_eq!(retried[0].status, DistributionStatus::Distributed);
    assert_eq!(retried[0].retry_count, 2);
    assert_eq!(
        service.status(id).unwrap().status,
        DistributionStatus::Distributed
    );
}

#[tokio::test]
async fn total_failure_is_retryable_not_fatal() {
    let transport = Arc::new(FlakyTransport::new());
    let service = service(Arc::clone(&transport));
    let targets = vec![verifier(1)];
    transport.set_unreachable(targets[0].node_id, true);

    let id = service.queue_seal(&sealed(), 2).unwrap();
    let record = service.distribute(id, &targets).await.unwrap();
    assert_eq!(record.status, DistributionStatus::Failed);
    assert_eq!(record.deliveries[0].success, false);
    assert!(record.deliveries[0].error.is_some());
    // Still queryable, still queued
    assert_eq!(service.status(id).unwrap().status, DistributionStatus::Failed);
}

#[tokio::test]
async fn priority_orders_bandwidth_selection() {
    let transport = Arc::new(FlakyTransport::new());
    let service = service(transport);

    // Priority 5 enqueued before priority 1: the high-priority record
    // dispatches first even though both are selectable
    let urgent = service.queue_seal(&sealed(), 5).unwrap();
    let routine = service.queue_seal(&sealed(), 1).unwrap();

    let selected = service.optimize_bandwidth(1);
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].distribution_id, urgent);
    assert_eq!(selected[0].status, DistributionStatus::Distributing);

    let selected = service.optimize_bandwidth(1);
    assert_eq!(selected[0].distribution_id, routine);
}

#[tokio::test]
async fn receipts_reject_non_target_nodes() {
    let transport = Arc::new(FlakyTransport::new());
    let service = service(Arc::clone(&transport));
    let targets = vec![verifier(1), verifier(2)];
    let outsider = verifier(9);
    // Keep the record live: a fully distributed record moves to
    // history and stops accepting receipts
    transport.set_unreachable(targets[1].node_id, true);

    let id = service.queue_seal(&sealed(), 3).unwrap();
    service.distribute(id, &targets).await.unwrap();

    let record = service
        .record_receipt(id, targets[0].node_id, ReceiptStatus::Received, None)
        .unwrap();
    assert!(record
        .node_receipts
        .iter()
        .any(|receipt| receipt.node_id == targets[0].node_id
            && receipt.status == ReceiptStatus::Received));

    let err = service
        .record_receipt(id, outsider.node_id, ReceiptStatus::Received, None)
        .expect_err("outsider receipt must be rejected");
    assert_eq!(err.category(), "invariant_violation");
}

#[tokio::test]
async fn invalid_priority_is_rejected_at_queue_time() {
    let transport = Arc::new(FlakyTransport::new());
    let service = service(transport);
    assert!(service.queue_seal(&sealed(), 0).is_err());
    assert!(service.queue_seal(&sealed(), 6).is_err());
}

#[tokio::test]
async fn reprioritize_promotes_before_next_dequeue() {
    let transport = Arc::new(FlakyTransport::new());
    let service = service(transport);

    let first = service.queue_seal(&sealed(), 3).unwrap();
    let second = service.queue_seal(&sealed(), 3).unwrap();
    service.reprioritize(second, 5).unwrap();

    let selected = service.optimize_bandwidth(2);
    assert_eq!(selected[0].distribution_id, second);
    assert_eq!(selected[1].distribution_id, first);
}
