//! Hash primitives for the record core.
//!
//! Two domain-separated 256-bit hash families are in use:
//!
//! - The **body** family (BLAKE3) authenticates record bodies, chains
//!   selector claims to them, and produces record hashes and ids.
//! - The **work** family (SHA3-256) produces the proof-of-work input hash
//!   and the final signature target.
//!
//! Every node in a network must use the same body hash construction
//! everywhere it appears; nodes that disagree split the data set.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use std::fmt;

/// A 32-byte record hash (body-family digest of a record's canonical bytes).
///
/// Links and certificate references name records by this hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordHash(pub [u8; 32]);

impl RecordHash {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// The zero hash (sentinel value).
    pub const ZERO: Self = Self([0u8; 32]);
}

impl fmt::Debug for RecordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for RecordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for RecordHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for RecordHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// A 32-byte record id: the body-family digest over the record's selector
/// database keys sorted ascending.
///
/// A record with no selectors uses its hash as its id, so the two spaces
/// intentionally collide there.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub [u8; 32]);

impl RecordId {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// The zero id (sentinel value).
    pub const ZERO: Self = Self([0u8; 32]);
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for RecordId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for RecordId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// Streaming digest for the body-side hash family.
#[derive(Default)]
pub struct BodyDigest(blake3::Hasher);

impl BodyDigest {
    /// Start a new digest.
    pub fn new() -> Self {
        Self(blake3::Hasher::new())
    }

    /// Feed bytes into the digest.
    pub fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    /// Finish and return the 32-byte sum.
    pub fn finalize(self) -> [u8; 32] {
        *self.0.finalize().as_bytes()
    }
}

/// One-shot body-family digest.
pub fn body_digest(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Streaming digest for the work-side hash family (SHA3-256).
#[derive(Default)]
pub struct WorkDigest(Sha3_256);

impl WorkDigest {
    /// Start a new digest.
    pub fn new() -> Self {
        Self(Sha3_256::new())
    }

    /// Feed bytes into the digest.
    pub fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.0, data);
    }

    /// Finish and return the 32-byte sum.
    pub fn finalize(self) -> [u8; 32] {
        self.0.finalize().into()
    }
}

/// One-shot work-family digest.
pub fn work_digest(data: &[u8]) -> [u8; 32] {
    Sha3_256::digest(data).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_digest_deterministic() {
        let data = b"test data";
        assert_eq!(body_digest(data), body_digest(data));
        assert_ne!(body_digest(data), body_digest(b"other data"));
    }

    #[test]
    fn test_work_digest_deterministic() {
        let data = b"test data";
        assert_eq!(work_digest(data), work_digest(data));
        assert_ne!(work_digest(data), work_digest(b"other data"));
    }

    #[test]
    fn test_families_are_separated() {
        let data = b"same input";
        assert_ne!(body_digest(data), work_digest(data));
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        let mut body = BodyDigest::new();
        body.update(b"hello ");
        body.update(b"world");
        assert_eq!(body.finalize(), body_digest(b"hello world"));

        let mut work = WorkDigest::new();
        work.update(b"hello ");
        work.update(b"world");
        assert_eq!(work.finalize(), work_digest(b"hello world"));
    }

    #[test]
    fn test_record_hash_hex_roundtrip() {
        let hash = RecordHash::from_bytes([0x42; 32]);
        let recovered = RecordHash::from_hex(&hash.to_hex()).unwrap();
        assert_eq!(hash, recovered);
    }

    #[test]
    fn test_record_id_hex_roundtrip() {
        let id = RecordId::from_bytes([0xab; 32]);
        let recovered = RecordId::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, recovered);
    }

    #[test]
    fn test_record_hash_debug() {
        let hash = RecordHash::from_bytes([0xcd; 32]);
        assert!(format!("{:?}", hash).starts_with("RecordHash("));
        assert_eq!(format!("{}", hash), "cdcdcdcdcdcdcdcd");
    }
}
