//! The seal distribution service
//!
//! Owns the distribution queue and all in-flight records. Outbound
//! delivery is the fabric's fan-out point: each distribute call
//! attempts every target concurrently, bounded by a per-target
//! timeout. The service's lock is never held across an await; state
//! is snapshotted before delivery and reconciled after.

use crate::queue::PriorityQueue;
use crate::record::{
    validate_priority, DeliveryAttempt, DistributionRecord, DistributionStatus, NodeReceipt,
    ReceiptStatus, StatusSummary,
};
use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use veris_core::{
    now, DistributionConfig, DistributionId, NodeId, Result, SealId, Timestamp, VerisError,
};
use veris_journal::Ledger;
use veris_registry::VerificationNode;
use veris_seal::MerkleSeal;

/// Transport seam for seal delivery.
///
/// The fabric assumes an external transport; it requires only that a
/// delivery either completes or fails within the configured timeout.
#[async_trait]
pub trait SealTransport: Send + Sync {
    /// Deliver a seal to one node
    async fn send_seal(&self, seal: &MerkleSeal, node: &VerificationNode) -> Result<()>;
}

/// One node's view of a past delivery, for node history queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDeliveryEvent {
    /// The distribution the delivery belonged to
    pub distribution_id: DistributionId,
    /// The seal that was delivered
    pub seal_id: SealId,
    /// Attempt time
    pub timestamp: Timestamp,
    /// Whether the delivery succeeded
    pub success: bool,
    /// Record status at query time
    pub status: DistributionStatus,
}

#[derive(Default)]
struct Inner {
    records: HashMap<DistributionId, DistributionRecord>,
    seals: HashMap<DistributionId, MerkleSeal>,
    queue: PriorityQueue,
}

/// Priority-ordered, retry-capable seal distribution
pub struct DistributionService {
    config: DistributionConfig,
    transport: Arc<dyn SealTransport>,
    inner: Mutex<Inner>,
    history: Ledger<DistributionRecord>,
}

impl DistributionService {
    /// Create a service over a transport
    pub fn new(transport: Arc<dyn SealTransport>, config: DistributionConfig) -> Self {
        Self {
            config,
            transport,
            inner: Mutex::new(Inner::default()),
            history: Ledger::new("distribution-history"),
        }
    }

    /// Queue a seal for distribution.
    ///
    /// Validates the seal against its schema and rejects priorities
    /// outside [1, 5].
    pub fn queue_seal(&self, seal: &MerkleSeal, priority: u8) -> Result<DistributionId> {
        validate_priority(priority)?;
        seal.validate()?;

        let record = DistributionRecord::queued(seal.seal_id, priority)?;
        let id = record.distribution_id;
        let mut inner = self.inner.lock();
        inner.seals.insert(id, seal.clone());
        inner.records.insert(id, record);
        inner.queue.push(id, priority);
        tracing::debug!(distribution = %id, seal = %seal.seal_id, priority, "seal queued");
        Ok(id)
    }

    /// Distribute a record to a target node set.
    ///
    /// Attempts every target concurrently with a per-target timeout,
    /// then derives the terminal status from the delivery results
    /// alone. A fully distributed record moves to history; anything
    /// less remains in the queue for retry.
    pub async fn distribute(
        &self,
        distribution_id: DistributionId,
        targets: &[VerificationNode],
    ) -> Result<DistributionRecord> {
        let seal = {
            let mut inner = self.inner.lock();
            let record = inner.records.get_mut(&distribution_id).ok_or_else(|| {
                VerisError::not_found(format!("distribution {distribution_id} not found"))
            })?;
            record.status = DistributionStatus::Distributing;
            record.target_nodes = targets.iter().map(|node| node.node_id).collect();
            record.node_receipts = targets
                .iter()
                .map(|node| NodeReceipt {
                    node_id: node.node_id,
                    status: ReceiptStatus::Pending,
                    timestamp: now(),
                    message: None,
                })
                .collect();
            inner
                .seals
                .get(&distribution_id)
                .cloned()
                .ok_or_else(|| VerisError::internal("record without seal"))?
        };

        let deliveries = self.deliver_to_all(&seal, targets).await;

        let mut inner = self.inner.lock();
        let record = inner.records.get_mut(&distribution_id).ok_or_else(|| {
            VerisError::not_found(format!("distribution {distribution_id} vanished"))
        })?;
        record.deliveries = deliveries;
        record.retry_count += 1;
        record.status = DistributionRecord::derive_status(&record.deliveries);

        match record.status {
            DistributionStatus::Distributed => {
                let record = record.clone();
                inner.queue.remove(distribution_id);
                inner.records.remove(&distribution_id);
                inner.seals.remove(&distribution_id);
                self.history.append(record.clone());
                tracing::info!(distribution = %distribution_id, "fully distributed");
                Ok(record)
            }
            status => {
                let priority = record.priority;
                let record = record.clone();
                if !inner.queue.contains(distribution_id) {
                    inner.queue.push(distribution_id, priority);
                }
                tracing::warn!(
                    distribution = %distribution_id,
                    ?status,
                    retry_count = record.retry_count,
                    "distribution incomplete, remains queued"
                );
                Ok(record)
            }
        }
    }

    /// Record an advisory receipt from a node.
    ///
    /// Rejects node ids that are not in the record's target set.
    pub fn record_receipt(
        &self,
        distribution_id: DistributionId,
        node_id: NodeId,
        status: ReceiptStatus,
        message: Option<String>,
    ) -> Result<DistributionRecord> {
        let mut inner = self.inner.lock();
        let record = inner.records.get_mut(&distribution_id).ok_or_else(|| {
            VerisError::not_found(format!("distribution {distribution_id} not found"))
        })?;
        if !record.target_nodes.contains(&node_id) {
            return Err(VerisError::invariant(format!(
                "node {node_id} is not a target of distribution {distribution_id}"
            )));
        }

        match record
            .node_receipts
            .iter_mut()
            .find(|receipt| receipt.node_id == node_id)
        {
            Some(receipt) => {
                receipt.status = status;
                receipt.timestamp = now();
                receipt.message = message;
            }
            None => record.node_receipts.push(NodeReceipt {
                node_id,
                status,
                timestamp: now(),
                message,
            }),
        }
        Ok(record.clone())
    }

    /// Re-attempt every failed and partially distributed record
    /// against the provided node set.
    ///
    /// Records at the configured retry cap are skipped with a warning,
    /// never dropped.
    pub async fn retry_failed(
        &self,
        targets: &[VerificationNode],
    ) -> Result<Vec<DistributionRecord>> {
        let candidates: Vec<(DistributionId, u32)> = {
            let inner = self.inner.lock();
            inner
                .records
                .values()
                .filter(|record| record.needs_retry())
                .map(|record| (record.distribution_id, record.retry_count))
                .collect()
        };

        let mut results = Vec::with_capacity(candidates.len());
        for (id, retry_count) in candidates {
            if let Some(max) = self.config.max_retries {
                if retry_count >= max {
                    tracing::warn!(distribution = %id, retry_count, "retry cap reached, skipping");
                    continue;
                }
            }
            results.push(self.distribute(id, targets).await?);
        }
        Ok(results)
    }

    /// Select up to `max_concurrent` queued records by priority and
    /// mark them distributing, for external dispatch.
    ///
    /// Failed and partially distributed records stay queued for
    /// `retry_failed` and are not selected here.
    pub fn optimize_bandwidth(&self, max_concurrent: usize) -> Vec<DistributionRecord> {
        let mut inner = self.inner.lock();
        let mut selected = Vec::new();
        let mut requeue = Vec::new();

        while selected.len() < max_concurrent {
            let Some(id) = inner.queue.pop() else {
                break;
            };
            match inner.records.get_mut(&id) {
                Some(record) if record.status == DistributionStatus::Queued => {
                    record.status = DistributionStatus::Distributing;
                    selected.push(record.clone());
                }
                Some(record) => requeue.push((id, record.priority)),
                None => {}
            }
        }
        for (id, priority) in requeue {
            inner.queue.push(id, priority);
        }
        selected
    }

    /// Change a record's priority; takes effect before the next
    /// dequeue
    pub fn reprioritize(
        &self,
        distribution_id: DistributionId,
        priority: u8,
    ) -> Result<DistributionRecord> {
        validate_priority(priority)?;
        let mut inner = self.inner.lock();
        let record = inner.records.get_mut(&distribution_id).ok_or_else(|| {
            VerisError::not_found(format!("distribution {distribution_id} not found"))
        })?;
        record.priority = priority;
        let record = record.clone();
        inner.queue.reprioritize(distribution_id, priority);
        Ok(record)
    }

    /// Status summary for a record, in the queue or in history
    pub fn status(&self, distribution_id: DistributionId) -> Result<StatusSummary> {
        if let Some(record) = self.inner.lock().records.get(&distribution_id) {
            return Ok(record.summary());
        }
        self.history
            .entries()
            .into_iter()
            .map(|entry| entry.value)
            .find(|record| record.distribution_id == distribution_id)
            .map(|record| record.summary())
            .ok_or_else(|| {
                VerisError::not_found(format!("distribution {distribution_id} not found"))
            })
    }

    /// All distributions of a seal, live and historical
    pub fn seal_history(&self, seal_id: SealId) -> Vec<StatusSummary> {
        let mut summaries: Vec<StatusSummary> = self
            .inner
            .lock()
            .records
            .values()
            .filter(|record| record.seal_id == seal_id)
            .map(|record| record.summary())
            .collect();
        summaries.extend(
            self.history
                .filtered(|record| record.seal_id == seal_id)
                .into_iter()
                .map(|entry| entry.value.summary()),
        );
        summaries
    }

    /// All deliveries that involved a node, live and historical
    pub fn node_history(&self, node_id: NodeId) -> Vec<NodeDeliveryEvent> {
        let mut events = Vec::new();
        {
            let inner = self.inner.lock();
            for record in inner.records.values() {
                events.extend(delivery_events(record, node_id));
            }
        }
        for entry in self.history.entries() {
            events.extend(delivery_events(&entry.value, node_id));
        }
        events
    }

    async fn deliver_to_all(
        &self,
        seal: &MerkleSeal,
        targets: &[VerificationNode],
    ) -> Vec<DeliveryAttempt> {
        let attempts = targets.iter().map(|node| {
            let transport = Arc::clone(&self.transport);
            let timeout = self.config.per_target_timeout;
            async move {
                let outcome =
                    tokio::time::timeout(timeout, transport.send_seal(seal, node)).await;
                let error = match outcome {
                    Ok(Ok(())) => None,
                    Ok(Err(err)) => Some(err.to_string()),
                    Err(_) => Some(format!("delivery timed out after {timeout:?}")),
                };
                if let Some(error) = &error {
                    tracing::warn!(node = %node.node_id, error, "delivery failed");
                }
                DeliveryAttempt {
                    node_id: node.node_id,
                    success: error.is_none(),
                    timestamp: now(),
                    error,
                }
            }
        });
        join_all(attempts).await
    }
}

fn delivery_events(record: &DistributionRecord, node_id: NodeId) -> Vec<NodeDeliveryEvent> {
    record
        .deliveries
        .iter()
        .filter(|delivery| delivery.node_id == node_id)
        .map(|delivery| NodeDeliveryEvent {
            distribution_id: record.distribution_id,
            seal_id: record.seal_id,
            timestamp: delivery.timestamp,
            success: delivery.success,
            status: record.status,
        })
        .collect()
}
