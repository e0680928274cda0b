//! Canonical byte encoding for hashed objects
//!
//! Every object that enters a hash does so through its canonical form:
//! object keys sorted lexicographically, strings UTF-8, numbers in
//! their minimal decimal form, byte strings base64url without padding.
//! Fields that hold the hash itself (e.g. `root_hash`) are stripped
//! before encoding so a record can be re-hashed for verification.

use crate::errors::{Result, VerisError};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Serialize;
use serde_json::Value;

/// Canonical byte encoding of any serializable value.
///
/// Round-trips the value through `serde_json::Value`, whose object map
/// is backed by a BTreeMap, so keys serialize in sorted order at every
/// nesting depth.
pub fn canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let value = serde_json::to_value(value)?;
    serde_json::to_vec(&value).map_err(|e| VerisError::serialization(e.to_string()))
}

/// Canonical byte encoding with named top-level fields excluded.
///
/// Used when the hashed form must not contain the hash-bearing fields
/// themselves.
pub fn canonical_bytes_excluding<T: Serialize>(value: &T, exclude: &[&str]) -> Result<Vec<u8>> {
    let mut value = serde_json::to_value(value)?;
    if let Value::Object(map) = &mut value {
        for key in exclude {
            map.remove(*key);
        }
    }
    serde_json::to_vec(&value).map_err(|e| VerisError::serialization(e.to_string()))
}

/// Serde adapter encoding `Vec<u8>` as base64url without padding.
///
/// Used for output payloads and opaque signatures so their canonical
/// JSON form is stable and printable.
pub mod base64url {
    use super::{Engine, URL_SAFE_NO_PAD};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize bytes as a base64url string
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Deserialize bytes from a base64url string
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        URL_SAFE_NO_PAD
            .decode(s.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
