//! # Veris Consensus - strong agreement over seal verdicts
//!
//! Collects per-node verification verdicts for a seal into a consensus
//! record, recomputing the positive ratio against a configured
//! threshold, and aggregates per-node signatures into a single
//! threshold signature once enough of the active set has signed.
//! Disagreement is not an error: it transitions the record to a
//! conflicted state that awaits an explicit, audit-only resolution.

#![forbid(unsafe_code)]

/// Consensus records and their state machine
pub mod record;
/// The consensus service
pub mod service;
/// Threshold signature aggregation
pub mod threshold;

pub use record::{
    ConflictResolution, ConsensusRecord, ConsensusState, Participant, ResolutionMethod,
};
pub use service::{ConsensusService, NodeDirectory, VerificationStatus, VerificationSummary};
pub use threshold::ThresholdAggregator;
