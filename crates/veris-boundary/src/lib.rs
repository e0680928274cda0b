//! # Veris Boundary - enforcement at the network edge
//!
//! Decides allow/deny for (source, operation, resource) triples using
//! three policy sources: direct or propagated trust from the trust
//! surface, enforcement policies with precedence-based conflict
//! resolution, and attestations verified through an external service.
//! Every decision - allow or deny - lands in the append-only
//! enforcement log with its reason. A deny is a normal outcome, never
//! an error.

#![forbid(unsafe_code)]

/// Attestations and the external verifier seam
pub mod attestation;
/// The enforcement module and its log
pub mod enforcement;
/// Enforcement policies and conflict resolution
pub mod policy;

pub use attestation::{Attestation, AttestationVerifier, InMemoryAttestations};
pub use enforcement::{
    EnforcementDecision, EnforcementLogEntry, EnforcementModule, LogFilter,
};
pub use policy::{EnforcementPolicy, PolicyFilter};
