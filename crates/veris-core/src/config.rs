//! Validating configuration constructors
//!
//! Configuration is validated once at construction so components can
//! assume their parameters are in range.

use crate::errors::{Result, VerisError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Consensus formation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Fraction of positive verdicts required, in (0.5, 1.0]
    pub threshold: f64,
}

impl ConsensusConfig {
    /// Create a consensus configuration.
    ///
    /// The threshold must lie in (0.5, 1.0]: at or below one half, two
    /// disjoint participant sets could both reach consensus.
    pub fn new(threshold: f64) -> Result<Self> {
        if !(threshold > 0.5 && threshold <= 1.0) {
            return Err(VerisError::schema(format!(
                "consensus threshold {threshold} must lie in (0.5, 1.0]"
            )));
        }
        Ok(Self { threshold })
    }
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self { threshold: 0.67 }
    }
}

/// Trust propagation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropagationConfig {
    /// Per-day multiplicative trust decay rate
    pub decay_rate: f64,
    /// Minimum edge weight considered for transitive search
    pub propagation_threshold: f64,
    /// Per-hop discount applied to propagated trust
    pub transitive_discount: f64,
    /// Maximum number of hops in a propagation path
    pub max_path_length: usize,
}

impl PropagationConfig {
    /// Create a propagation configuration with range checks
    pub fn new(
        decay_rate: f64,
        propagation_threshold: f64,
        transitive_discount: f64,
        max_path_length: usize,
    ) -> Result<Self> {
        if !(0.0..1.0).contains(&decay_rate) {
            return Err(VerisError::schema("decay rate must lie in [0, 1)"));
        }
        if !(0.0..=1.0).contains(&propagation_threshold) {
            return Err(VerisError::schema(
                "propagation threshold must lie in [0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&transitive_discount) {
            return Err(VerisError::schema("transitive discount must lie in [0, 1]"));
        }
        if max_path_length == 0 {
            return Err(VerisError::schema("max path length must be at least 1"));
        }
        Ok(Self {
            decay_rate,
            propagation_threshold,
            transitive_discount,
            max_path_length,
        })
    }
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            decay_rate: 0.1,
            propagation_threshold: 0.5,
            transitive_discount: 0.8,
            max_path_length: 3,
        }
    }
}

/// Seal distribution parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionConfig {
    /// Bound on each per-target delivery attempt
    pub per_target_timeout: Duration,
    /// Default cap for `optimize_bandwidth`
    pub max_concurrent: usize,
    /// Retry cap per record; `None` means unbounded (operator-configurable)
    pub max_retries: Option<u32>,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            per_target_timeout: Duration::from_secs(5),
            max_concurrent: 5,
            max_retries: None,
        }
    }
}
