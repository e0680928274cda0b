//! Execution outputs
//!
//! An output is immutable after capture. Its canonical byte encoding
//! is what enters the Merkle tree; the id and metadata are part of
//! that encoding, so two outputs with identical payloads but different
//! ids hash differently.

use serde::{Deserialize, Serialize};
use veris_core::encoding::{base64url, canonical_bytes};
use veris_core::{OutputId, Result, VerisError};

/// A captured execution output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    /// Output identifier, assigned at capture
    pub id: OutputId,
    /// Output type tag (e.g. "log", "artifact", "decision")
    #[serde(rename = "type")]
    pub kind: String,
    /// Raw payload bytes, base64url in the canonical form
    #[serde(with = "base64url")]
    pub payload: Vec<u8>,
    /// Free-form capture metadata
    pub metadata: serde_json::Value,
}

impl Output {
    /// Capture a new output
    pub fn new(kind: impl Into<String>, payload: Vec<u8>, metadata: serde_json::Value) -> Self {
        Self {
            id: OutputId::new(),
            kind: kind.into(),
            payload,
            metadata,
        }
    }

    /// Schema check: required fields present and well-formed
    pub fn validate(&self) -> Result<()> {
        if self.kind.is_empty() {
            return Err(VerisError::schema(format!(
                "output {} has an empty type",
                self.id
            )));
        }
        Ok(())
    }

    /// Canonical byte encoding, the Merkle leaf pre-image
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        canonical_bytes(self)
    }
}
