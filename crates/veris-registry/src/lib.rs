//! # Veris Registry - verification nodes and topology
//!
//! Lifecycle of verification nodes (identity, role, capabilities,
//! status, trust) and the current network graph over them. The
//! registry and the topology manager each own their state exclusively;
//! other components hold node identifiers and query through the owner's
//! API. The registry never derives trust from verification outcomes -
//! trust mutation is reserved for the trust surface and operator
//! attestation events.

#![forbid(unsafe_code)]

/// Verification node records and status transitions
pub mod node;
/// Node registry: registration, lookup, lifecycle
pub mod registry;
/// Topology snapshots and transactional mutation
pub mod topology;

pub use node::{NodeRole, NodeStatus, VerificationNode};
pub use registry::NodeRegistry;
pub use topology::{Connection, ConnectionStatus, Topology, TopologyManager};
