//! Canonical hashing.
//!
//! The canonical hash is the SHA-256 of the key-sorted JSON serialization of
//! a canonical log. Two logs with identical canonical content always hash
//! identically, whatever the input formatting looked like.

use crate::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// SHA-256 over the key-sorted, compact JSON form of `value`, hex-encoded.
///
/// serde_json maps serialize with sorted keys here (BTreeMap-backed), so the
/// byte stream is deterministic across runs and platforms.
pub fn canonical_sha256<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_value(value)?;
    let bytes = serde_json::to_string(&json)?;
    let mut hasher = Sha256::new();
    hasher.update(bytes.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}
