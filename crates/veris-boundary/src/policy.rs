//! Enforcement policies
//!
//! A policy scopes a resource pattern to the operations it allows and
//! the trust and attestations it demands. When several policies apply
//! to one resource, conflict resolution is precedence-based: higher
//! precedence wins outright; at equal precedence the more restrictive
//! verdict (deny over allow) wins and the tie is logged for review.

use serde::{Deserialize, Serialize};
use veris_core::{now, PolicyId, Result, Timestamp, VerisError};

/// An enforcement policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnforcementPolicy {
    /// Policy identifier
    pub policy_id: PolicyId,
    /// Policy type tag (e.g. "data_access", "operations")
    pub policy_type: String,
    /// Resource pattern; a trailing `*` matches any suffix
    pub resource_pattern: String,
    /// Trust level demanded of the source, 0-100
    pub required_trust_level: u8,
    /// Attestation types the source must hold
    pub required_attestation_types: Vec<String>,
    /// Operations the policy allows
    pub allowed_operations: Vec<String>,
    /// Conflict-resolution precedence; higher wins
    pub precedence: u32,
    /// Resource paths exempt from this policy
    pub exceptions: Vec<String>,
    /// Creation time
    pub created_at: Timestamp,
}

impl EnforcementPolicy {
    /// Create a policy
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        policy_type: impl Into<String>,
        resource_pattern: impl Into<String>,
        required_trust_level: u8,
        required_attestation_types: Vec<String>,
        allowed_operations: Vec<String>,
        precedence: u32,
    ) -> Self {
        Self {
            policy_id: PolicyId::new(),
            policy_type: policy_type.into(),
            resource_pattern: resource_pattern.into(),
            required_trust_level,
            required_attestation_types,
            allowed_operations,
            precedence,
            exceptions: Vec::new(),
            created_at: now(),
        }
    }

    /// Schema check
    pub fn validate(&self) -> Result<()> {
        if self.resource_pattern.is_empty() {
            return Err(VerisError::schema(format!(
                "policy {} has an empty resource pattern",
                self.policy_id
            )));
        }
        if self.required_trust_level > 100 {
            return Err(VerisError::schema(format!(
                "policy {} required trust {} above 100",
                self.policy_id, self.required_trust_level
            )));
        }
        Ok(())
    }

    /// Whether the policy applies to a resource path.
    ///
    /// Exceptions are checked with the same pattern rules and exempt
    /// the resource from the policy entirely.
    pub fn matches_resource(&self, resource_path: &str) -> bool {
        if !pattern_matches(&self.resource_pattern, resource_path) {
            return false;
        }
        !self
            .exceptions
            .iter()
            .any(|exception| pattern_matches(exception, resource_path))
    }

    /// Whether the policy allows an operation
    pub fn allows_operation(&self, operation: &str) -> bool {
        self.allowed_operations.iter().any(|op| op == operation)
    }
}

/// Filter for policy list queries
#[derive(Debug, Clone, Default)]
pub struct PolicyFilter {
    /// Match this policy type
    pub policy_type: Option<String>,
    /// Match this exact resource pattern
    pub resource_pattern: Option<String>,
}

impl PolicyFilter {
    /// Whether a policy matches this filter
    pub fn matches(&self, policy: &EnforcementPolicy) -> bool {
        self.policy_type
            .as_deref()
            .map_or(true, |t| policy.policy_type == t)
            && self
                .resource_pattern
                .as_deref()
                .map_or(true, |p| policy.resource_pattern == p)
    }
}

/// Prefix-style pattern match: a trailing `*` matches any suffix,
/// otherwise the match is exact.
fn pattern_matches(pattern: &str, path: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => path.starts_with(prefix),
        None => path == pattern,
    }
}
