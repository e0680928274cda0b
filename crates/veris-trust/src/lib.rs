//! # Veris Trust - the trust surface
//!
//! Three tightly coupled pieces:
//!
//! - the boundary manager, exclusive owner of trust boundaries between
//!   runtime instances (integer trust levels 0-100);
//! - the trust aggregation service, which converts closed consensus
//!   records plus node trust into per-seal trust scores with
//!   confidence metrics and append-only history;
//! - the trust propagation engine, which maintains the directed trust
//!   graph sourced from active boundaries and computes direct and
//!   path-discounted transitive trust, with decay, reinforcement, and
//!   conflict handling.
//!
//! Trust levels are integers 0-100 at the boundary layer and reals
//! 0.0-1.0 on the graph; conversion is division or multiplication by
//! one hundred.

#![forbid(unsafe_code)]

/// Per-seal trust scores from consensus records
pub mod aggregation;
/// Trust boundaries and their manager
pub mod boundary;
/// The trust graph and propagation engine
pub mod propagation;

pub use aggregation::{ConfidenceMetrics, TrustAggregationService, TrustRecord, TrustSummary, WeightedResult};
pub use boundary::{Boundary, BoundaryFilter, BoundaryManager, BoundaryStatus};
pub use propagation::{
    ConflictFilter, TrustChange, TrustConflict, TrustConflictStatus, TrustPropagationEngine,
};
