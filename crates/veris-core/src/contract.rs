//! Contract versions and tether checks
//!
//! Two contract versions coexist and are routed by object type: the
//! seal/consensus path and the trust/boundary path. A produced artifact
//! is tethered to its path by the pair (contract version, phase id);
//! any mismatch is a fatal tether failure and the artifact must not be
//! produced.

use crate::errors::{Result, VerisError};
use serde::{Deserialize, Serialize};

/// Phase id of the sealing components
pub const PHASE_SEALING: &str = "5.3";
/// Phase id of the verification network components
pub const PHASE_VERIFICATION: &str = "5.4";
/// Phase id of the trust surface components
pub const PHASE_TRUST: &str = "5.6";

/// The two coexisting contract paths.
///
/// Implementations must route by object type and never conflate the
/// versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractPath {
    /// Seals, distribution, and consensus records
    SealConsensus,
    /// Trust records, boundaries, and enforcement
    TrustBoundary,
}

impl ContractPath {
    /// Contract version string for this path
    pub fn version(&self) -> &'static str {
        match self {
            Self::SealConsensus => "v2025.05.20",
            Self::TrustBoundary => "v2025.05.18",
        }
    }

    /// Phase ids accepted on this path.
    ///
    /// Phase 5.4 appears on both paths: distribution and consensus
    /// records live on the seal path, trust aggregation records on the
    /// trust path.
    pub fn phases(&self) -> &'static [&'static str] {
        match self {
            Self::SealConsensus => &[PHASE_SEALING, PHASE_VERIFICATION],
            Self::TrustBoundary => &[PHASE_VERIFICATION, PHASE_TRUST],
        }
    }
}

/// Pre-loop tether check.
///
/// Components perform this at construction and before producing any
/// artifact. Failure is fatal: the caller records a critical
/// tether-failure conflict and produces no output.
pub fn tether_check(path: ContractPath, contract_version: &str, phase_id: &str) -> Result<()> {
    if contract_version != path.version() {
        return Err(VerisError::tether(format!(
            "contract version {contract_version} does not match {} for {path:?}",
            path.version()
        )));
    }
    if !path.phases().contains(&phase_id) {
        return Err(VerisError::tether(format!(
            "phase id {phase_id} is not valid for {path:?}"
        )));
    }
    Ok(())
}
