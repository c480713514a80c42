//! Selectors: privacy-preserving record keys.
//!
//! A selector binds a plaintext name and a 64-bit ordinal to one record
//! body without revealing the name. The claim key pair is derived from the
//! name alone, so anyone who knows the name can recompute the public key
//! and look records up. The claim signature proves the record's creator
//! also knew the name, which keeps blind poisoning of a name's key space
//! infeasible.
//!
//! The ordinal is folded into the database key through an order-preserving
//! encoding: under one name, the sort order of selector keys equals the
//! numeric order of the ordinals. That property is what makes range
//! queries over ordinals possible without publishing the ordinal itself.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use std::fmt;

use crate::error::Error;
use crate::wire::{write_uvarint, ByteReader};

const CLAIM_KEY_CONTEXT: &str = "loam/selector-claim/v0";
const ORDINAL_KEY_CONTEXT: &str = "loam/selector-ordinal/v0";

/// Size of the order-preserving ordinal encoding in selector keys.
pub const SELECTOR_ORDINAL_SIZE: usize = 16;

/// Size of a selector's database key (claim key + encoded ordinal).
pub const SELECTOR_KEY_SIZE: usize = 32 + SELECTOR_ORDINAL_SIZE;

fn claim_signing_key(name: &[u8]) -> SigningKey {
    SigningKey::from_bytes(&blake3::derive_key(CLAIM_KEY_CONTEXT, name))
}

/// Encode an ordinal order-preservingly under a name-derived key.
///
/// Each big-endian byte of the ordinal is mapped through a keyed strictly
/// increasing function into 16 bits. Equal ordinals under one name encode
/// identically; comparing encodings byte-wise compares the ordinals.
fn encode_ordinal(name: &[u8], ordinal: u64) -> [u8; SELECTOR_ORDINAL_SIZE] {
    let key = blake3::derive_key(ORDINAL_KEY_CONTEXT, name);
    let mut out = [0u8; SELECTOR_ORDINAL_SIZE];
    for (i, &byte) in ordinal.to_be_bytes().iter().enumerate() {
        let mut pad = [0u8; 256];
        let mut hasher = blake3::Hasher::new_keyed(&key);
        hasher.update(&[i as u8]);
        hasher.finalize_xof().fill(&mut pad);

        let mut acc: u16 = 0;
        for &step in &pad[..=byte as usize] {
            acc += 1 + u16::from(step & 0x7f);
        }
        out[i * 2..i * 2 + 2].copy_from_slice(&acc.to_be_bytes());
    }
    out
}

/// A selector with its claim signature, bound to one record body.
#[derive(Clone, PartialEq, Eq)]
pub struct Selector {
    claim_key: [u8; 32],
    ordinal: [u8; SELECTOR_ORDINAL_SIZE],
    claim_signature: [u8; 64],
}

impl Selector {
    /// Derive a selector from a plaintext name and ordinal, signing the
    /// supplied claim hash with the name-derived key.
    pub fn claim(name: &[u8], ordinal: u64, claim_hash: &[u8; 32]) -> Self {
        let signing_key = claim_signing_key(name);
        let claim_signature = signing_key.sign(claim_hash).to_bytes();
        Self {
            claim_key: signing_key.verifying_key().to_bytes(),
            ordinal: encode_ordinal(name, ordinal),
            claim_signature,
        }
    }

    /// Database key: the claim public key followed by the encoded ordinal.
    pub fn key(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SELECTOR_KEY_SIZE);
        out.extend_from_slice(&self.claim_key);
        out.extend_from_slice(&self.ordinal);
        out
    }

    /// The claim public key, shared by every selector under one name.
    pub fn claim_key(&self) -> &[u8; 32] {
        &self.claim_key
    }

    /// The encoded ordinal bytes.
    pub fn ordinal(&self) -> &[u8; SELECTOR_ORDINAL_SIZE] {
        &self.ordinal
    }

    /// Verify the claim signature against a chained claim hash.
    pub fn verify_claim(&self, claim_hash: &[u8; 32]) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(&self.claim_key) else {
            return false;
        };
        let signature = Signature::from_bytes(&self.claim_signature);
        key.verify(claim_hash, &signature).is_ok()
    }

    /// Canonical wire bytes including the claim signature.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size_bytes());
        self.marshal_to(&mut out);
        out
    }

    /// Serialized size of this selector.
    pub fn size_bytes(&self) -> usize {
        1 + 32 + SELECTOR_ORDINAL_SIZE + 1 + 64
    }

    pub(crate) fn marshal_to(&self, out: &mut Vec<u8>) {
        write_uvarint(out, self.claim_key.len() as u64);
        out.extend_from_slice(&self.claim_key);
        out.extend_from_slice(&self.ordinal);
        write_uvarint(out, self.claim_signature.len() as u64);
        out.extend_from_slice(&self.claim_signature);
    }

    pub(crate) fn unmarshal(reader: &mut ByteReader<'_>) -> Result<Self, Error> {
        let key_len = reader.read_uvarint()?;
        if key_len != 32 {
            return Err(Error::RecordInvalid("selector claim key length"));
        }
        let claim_key = reader.read_array::<32>()?;
        let ordinal = reader.read_array::<SELECTOR_ORDINAL_SIZE>()?;
        let signature_len = reader.read_uvarint()?;
        if signature_len != 64 {
            return Err(Error::RecordInvalid("selector claim signature length"));
        }
        let claim_signature = reader.read_array::<64>()?;
        Ok(Self {
            claim_key,
            ordinal,
            claim_signature,
        })
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector({})", &hex::encode(self.claim_key)[..16])
    }
}

/// Compute the database key a claimed selector with this name and ordinal
/// exposes.
///
/// This is the read path: a node that knows a name derives the same key a
/// writer produced, without constructing a claim. Range queries fix the
/// claim-key prefix and scan between two encoded ordinals.
pub fn selector_key(name: &[u8], ordinal: u64) -> Vec<u8> {
    let verifying_key = claim_signing_key(name).verifying_key();
    let mut out = Vec::with_capacity(SELECTOR_KEY_SIZE);
    out.extend_from_slice(verifying_key.as_bytes());
    out.extend_from_slice(&encode_ordinal(name, ordinal));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_verifies() {
        let hash = [0x33u8; 32];
        let selector = Selector::claim(b"name", 5, &hash);
        assert!(selector.verify_claim(&hash));

        let mut wrong = hash;
        wrong[0] ^= 0x01;
        assert!(!selector.verify_claim(&wrong));
    }

    #[test]
    fn test_tampered_signature_fails() {
        let hash = [0x33u8; 32];
        let mut selector = Selector::claim(b"name", 5, &hash);
        selector.claim_signature[0] ^= 0x01;
        assert!(!selector.verify_claim(&hash));
    }

    #[test]
    fn test_same_name_same_claim_key() {
        let hash = [0u8; 32];
        let a = Selector::claim(b"shared", 1, &hash);
        let b = Selector::claim(b"shared", 2, &hash);
        assert_eq!(a.claim_key(), b.claim_key());
        assert_ne!(a.ordinal(), b.ordinal());
    }

    #[test]
    fn test_different_names_different_keys() {
        let hash = [0u8; 32];
        let a = Selector::claim(b"one", 1, &hash);
        let b = Selector::claim(b"two", 1, &hash);
        assert_ne!(a.claim_key(), b.claim_key());
    }

    #[test]
    fn test_key_matches_query_side() {
        let hash = [0u8; 32];
        let selector = Selector::claim(b"lookup", 42, &hash);
        assert_eq!(selector.key(), selector_key(b"lookup", 42));
    }

    #[test]
    fn test_ordinal_order_preserved() {
        let ordinals = [0u64, 1, 2, 127, 128, 255, 256, 65535, 1 << 32, u64::MAX - 1, u64::MAX];
        let keys: Vec<Vec<u8>> = ordinals
            .iter()
            .map(|&ordinal| selector_key(b"range", ordinal))
            .collect();
        for window in keys.windows(2) {
            assert!(window[0] < window[1]);
        }
    }

    #[test]
    fn test_ordinal_encoding_keyed_by_name() {
        assert_ne!(
            encode_ordinal(b"alpha", 1000),
            encode_ordinal(b"beta", 1000)
        );
        assert_eq!(
            encode_ordinal(b"alpha", 1000),
            encode_ordinal(b"alpha", 1000)
        );
    }

    #[test]
    fn test_wire_roundtrip() {
        let hash = [0x55u8; 32];
        let selector = Selector::claim(b"wire", 9, &hash);
        let bytes = selector.to_bytes();
        assert_eq!(bytes.len(), selector.size_bytes());

        let mut reader = ByteReader::new(&bytes);
        let decoded = Selector::unmarshal(&mut reader).unwrap();
        assert_eq!(decoded, selector);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_unmarshal_rejects_bad_lengths() {
        let hash = [0x55u8; 32];
        let mut bytes = Selector::claim(b"wire", 9, &hash).to_bytes();
        bytes[0] = 31;
        let mut reader = ByteReader::new(&bytes);
        assert!(Selector::unmarshal(&mut reader).is_err());
    }
}
