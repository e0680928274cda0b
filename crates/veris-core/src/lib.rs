//! # Veris Core - Foundation
//!
//! Single source of truth for the domain concepts shared by the
//! verification fabric: identifiers, digests, canonical encoding, the
//! Merkle tree, contract tethers, and the unified error type.
//!
//! This crate has zero dependencies on other Veris crates. Pure
//! computation only - no I/O, no clocks beyond timestamp capture, no
//! component state.

#![forbid(unsafe_code)]

/// Validating configuration constructors
pub mod config;
/// Contract versions and tether checks
pub mod contract;
/// Canonical byte encoding for hashed objects
pub mod encoding;
/// Unified error handling
pub mod errors;
/// SHA-256 hashing utilities
pub mod hash;
/// Identifier newtypes
pub mod identifiers;
/// Binary Merkle tree with inclusion proofs
pub mod merkle;
/// Opaque signature primitive and reference implementation
pub mod signing;
/// Timestamp capture
pub mod time;

pub use config::{ConsensusConfig, DistributionConfig, PropagationConfig};
pub use contract::{tether_check, ContractPath, PHASE_SEALING, PHASE_TRUST, PHASE_VERIFICATION};
pub use encoding::{canonical_bytes, canonical_bytes_excluding};
pub use errors::{Result, VerisError};
pub use hash::{hash, hasher, Hash32};
pub use identifiers::{
    AttestationId, BoundaryId, ConflictId, ConsensusId, DistributionId, InstanceId, LogEntryId,
    NodeId, OutputId, PolicyId, SealId, TopologyId, TrustRecordId,
};
pub use merkle::{verify_proof, MerkleProof, MerkleTree};
pub use signing::{Ed25519Scheme, SignatureScheme};
pub use time::{now, Timestamp};
