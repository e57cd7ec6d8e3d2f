//! # Content Digest
//!
//! SHA-256 fingerprints of canonicalized values. Receipts never store raw
//! tool arguments or results; they store these digests instead.
//!
//! `ContentDigest` can only be computed from `CanonicalBytes`, so every
//! input/output fingerprint goes through the JCS pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;
use crate::error::{CanonicalizationError, CoreError};

/// A 32-byte SHA-256 digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest {
    /// The raw 32-byte digest value.
    pub bytes: [u8; 32],
}

impl ContentDigest {
    /// Wrap raw digest bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        if s.len() != 64 || !s.is_ascii() {
            return Err(CoreError::InvalidDigest(format!(
                "expected 64 hex characters, got {} bytes",
                s.len()
            )));
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk)
                .map_err(|e| CoreError::InvalidDigest(e.to_string()))?;
            bytes[i] = u8::from_str_radix(pair, 16)
                .map_err(|e| CoreError::InvalidDigest(format!("{pair:?}: {e}")))?;
        }
        Ok(Self { bytes })
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Compute a SHA-256 content digest from canonical bytes.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    sha256_bytes(data.as_bytes())
}

/// SHA-256 of raw bytes that need no canonicalization (plain text).
pub fn sha256_bytes(data: &[u8]) -> ContentDigest {
    let hash = Sha256::digest(data);
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest::new(bytes)
}

/// Canonicalize an arbitrary serializable value and digest it.
///
/// This is the fingerprint recorded as a receipt's `input_hash` or
/// `output_hash`.
pub fn digest_value(value: &impl Serialize) -> Result<ContentDigest, CanonicalizationError> {
    let canonical = CanonicalBytes::new(value)?;
    Ok(sha256_digest(&canonical))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_digest_deterministic() {
        let cb = CanonicalBytes::new(&serde_json::json!({"a": 1, "b": 2})).unwrap();
        assert_eq!(sha256_digest(&cb), sha256_digest(&cb));
    }

    #[test]
    fn test_known_sha256_vector() {
        // SHA256("{}")
        let digest = digest_value(&serde_json::json!({})).unwrap();
        assert_eq!(
            digest.to_hex(),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn test_null_digest_vector() {
        // SHA256("null")
        let digest = digest_value(&serde_json::Value::Null).unwrap();
        assert_eq!(
            digest.to_hex(),
            "74234e98afe7498fb5daf1f36ac2d78acc339464f950703b8c019892f982b90b"
        );
    }

    #[test]
    fn test_different_inputs_different_digests() {
        let d1 = digest_value(&serde_json::json!({"a": 1})).unwrap();
        let d2 = digest_value(&serde_json::json!({"a": 2})).unwrap();
        assert_ne!(d1, d2);
    }

    #[test]
    fn test_hex_roundtrip_and_rejection() {
        let digest = digest_value(&serde_json::json!([1, 2, 3])).unwrap();
        let hex = digest.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(ContentDigest::from_hex(&hex).unwrap(), digest);
        assert!(ContentDigest::from_hex("abc").is_err());
        assert!(ContentDigest::from_hex(&"zz".repeat(32)).is_err());
    }
}
