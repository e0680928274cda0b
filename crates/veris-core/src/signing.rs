//! Opaque signature primitive
//!
//! The fabric treats signatures as arbitrary byte strings whose
//! validity is established by an external verifier. The core requires
//! only deterministic sign-then-verify and per-node key material; the
//! threshold-combine construction lives in the consensus crate.
//!
//! `Ed25519Scheme` is the reference implementation used by tests and
//! single-node deployments.

use crate::errors::{Result, VerisError};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

/// Signing and verification over opaque byte strings.
///
/// Implementations must be deterministic: signing the same message with
/// the same key always yields the same signature.
pub trait SignatureScheme: Send + Sync {
    /// Sign a message, returning the signature bytes
    fn sign(&self, message: &[u8]) -> Vec<u8>;

    /// Public key bytes of this signer
    fn public_key(&self) -> Vec<u8>;

    /// Verify a signature over a message against a public key
    fn verify(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool;
}

/// Ed25519 reference implementation
pub struct Ed25519Scheme {
    key: SigningKey,
}

impl Ed25519Scheme {
    /// Generate a fresh keypair
    pub fn generate() -> Self {
        let mut rng = rand::rngs::OsRng;
        Self {
            key: SigningKey::generate(&mut rng),
        }
    }

    /// Construct from a 32-byte seed
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(&seed),
        }
    }
}

impl SignatureScheme for Ed25519Scheme {
    fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.key.sign(message).to_bytes().to_vec()
    }

    fn public_key(&self) -> Vec<u8> {
        self.key.verifying_key().to_bytes().to_vec()
    }

    fn verify(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        let Ok(key_bytes) = <[u8; 32]>::try_from(public_key) else {
            return false;
        };
        let Ok(key) = VerifyingKey::from_bytes(&key_bytes) else {
            return false;
        };
        let Ok(sig_bytes) = <[u8; 64]>::try_from(signature) else {
            return false;
        };
        key.verify(message, &Signature::from_bytes(&sig_bytes))
            .is_ok()
    }
}

/// Parse and validate public key bytes, for registration-time checks
pub fn validate_public_key(public_key: &[u8]) -> Result<()> {
    let key_bytes: [u8; 32] = public_key
        .try_into()
        .map_err(|_| VerisError::schema("public key must be 32 bytes"))?;
    VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| VerisError::crypto(format!("invalid public key: {e}")))?;
    Ok(())
}
