//! # Veris Seal - tamper-evident output sealing
//!
//! Wraps batches of execution outputs into signed-for Merkle seals,
//! chained across executions: each seal records the id of the seal that
//! preceded it from the same generator, forming a total-order chain.
//! The Merkle root is the integrity anchor; no additional hash is
//! computed over the seal.
//!
//! Seal-level anomalies (schema, trust, tether) are classified into
//! typed conflict records by the conflict detector. A clean seal
//! carries the explicit `none` conflict record: conflicts are never
//! silently suppressed, and neither is their absence.

#![forbid(unsafe_code)]

/// Conflict records and the pure conflict classifier
pub mod conflict;
/// Seal generation, verification, and chain walking
pub mod generator;
/// Execution outputs, the raw material of seals
pub mod output;
/// The Merkle seal record and its schema
pub mod seal;
/// Append-only seal store with chain queries
pub mod store;

pub use conflict::{
    ArbitrationStatus, ConflictDetector, ConflictRecord, ConflictType, ResolutionStatus, Severity,
};
pub use generator::SealGenerator;
pub use output::Output;
pub use seal::{MerkleSeal, SealedEntry, TreeMeta};
pub use store::SealStore;
