//! Unified error system for the verification fabric
//!
//! A single error enum whose variants follow the fabric's error
//! taxonomy: schema violations, invariant violations, tether failures,
//! transport failures, lookups, and crypto failures. Conflict detection
//! and policy denials are ordinary results, never errors.

use serde::{Deserialize, Serialize};

/// Unified error type for all Veris operations
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum VerisError {
    /// A record failed validation against its schema
    #[error("Schema violation: {message}")]
    Schema {
        /// What failed to validate and why
        message: String,
    },

    /// A component invariant was violated
    #[error("Invariant violation: {message}")]
    Invariant {
        /// Which invariant and how it was broken
        message: String,
    },

    /// Contract version or phase id did not match the expected tether
    #[error("Tether failure: {message}")]
    Tether {
        /// The mismatched version or phase
        message: String,
    },

    /// A per-target delivery failed or timed out
    #[error("Transport failure: {message}")]
    Transport {
        /// The failed target and cause
        message: String,
    },

    /// Lookup by id found nothing
    #[error("Not found: {message}")]
    NotFound {
        /// What was looked up
        message: String,
    },

    /// Cryptographic operation failed
    #[error("Crypto error: {message}")]
    Crypto {
        /// The failing operation
        message: String,
    },

    /// Serialization or deserialization failed
    #[error("Serialization error: {message}")]
    Serialization {
        /// The failing encode/decode step
        message: String,
    },

    /// Internal error that callers cannot act on
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal failure
        message: String,
    },
}

impl VerisError {
    /// Create a schema violation error
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Create an invariant violation error
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }

    /// Create a tether failure error
    pub fn tether(message: impl Into<String>) -> Self {
        Self::Tether {
            message: message.into(),
        }
    }

    /// Create a transport failure error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a crypto error
    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the operation that produced this error may be retried.
    ///
    /// Only transport failures are retryable. Tether and invariant
    /// violations are fatal for the operation that raised them.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Stable category string for structured logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Schema { .. } => "schema_violation",
            Self::Invariant { .. } => "invariant_violation",
            Self::Tether { .. } => "tether_failure",
            Self::Transport { .. } => "transport_failure",
            Self::NotFound { .. } => "not_found",
            Self::Crypto { .. } => "crypto",
            Self::Serialization { .. } => "serialization",
            Self::Internal { .. } => "internal",
        }
    }
}

/// Standard Result type for Veris operations
pub type Result<T> = std::result::Result<T, VerisError>;

impl From<serde_json::Error> for VerisError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_is_retryable() {
        assert!(VerisError::transport("timeout").is_retryable());
        assert!(!VerisError::schema("bad seal").is_retryable());
        assert!(!VerisError::tether("wrong version").is_retryable());
        assert!(!VerisError::invariant("duplicate node").is_retryable());
    }

    #[test]
    fn categories_are_stable() {
        assert_eq!(VerisError::tether("x").category(), "tether_failure");
        assert_eq!(VerisError::not_found("x").category(), "not_found");
    }
}
