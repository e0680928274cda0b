//! SHA-256 hashing for content addressing
//!
//! Hashing is pure and synchronous. SHA-256 is the single algorithm
//! used throughout the fabric; seals record it explicitly in their tree
//! metadata so the choice is visible on the wire.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Name of the hash algorithm as recorded in seal tree metadata
pub const ALGORITHM: &str = "sha256";

/// A 32-byte SHA-256 digest
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Hash32(pub [u8; 32]);

impl Hash32 {
    /// Construct from raw bytes
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Hex encoding of the digest
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-character hex string
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash32({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Hash arbitrary bytes to a 32-byte digest
pub fn hash(data: &[u8]) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&digest);
    Hash32(output)
}

/// Incremental hasher for multi-part data
pub struct IncrementalHasher(Sha256);

impl IncrementalHasher {
    /// Update with more data
    pub fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    /// Finalize and return the digest
    pub fn finalize(self) -> Hash32 {
        let digest = self.0.finalize();
        let mut output = [0u8; 32];
        output.copy_from_slice(&digest);
        Hash32(output)
    }
}

/// Create an incremental hasher
pub fn hasher() -> IncrementalHasher {
    IncrementalHasher(Sha256::new())
}
