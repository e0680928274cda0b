//! # Veris Distribution - reliable seal delivery
//!
//! Priority-ordered delivery of seals to chosen node sets, with
//! per-node receipt tracking and bounded retry. The queue is a strict
//! priority queue with FIFO tie-breaking; the service never promotes a
//! lower-priority record ahead of a higher one. Delivery failures are
//! transport failures: recorded, retryable, never fatal to the record.

#![forbid(unsafe_code)]

/// Strict priority queue with FIFO tie-breaking
pub mod queue;
/// Distribution records, receipts, and status summaries
pub mod record;
/// The distribution service and its transport seam
pub mod service;

pub use queue::PriorityQueue;
pub use record::{
    DeliveryAttempt, DistributionRecord, DistributionStatus, NodeReceipt, ReceiptStatus,
    StatusSummary,
};
pub use service::{DistributionService, NodeDeliveryEvent, SealTransport};
