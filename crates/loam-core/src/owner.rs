//! Owner key pairs.
//!
//! An owner is the asymmetric key pair that signs records. Records embed
//! only the owner's public bytes; the private half never touches the wire.
//! The first byte of the public encoding discriminates the key type, so
//! additional curves can be introduced later without a record format
//! change.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;

use crate::error::Error;

/// Owner key type, encoded as the first byte of the owner public bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OwnerKeyType {
    /// Ed25519 (the default seeded type).
    Ed25519 = 0x01,
}

impl OwnerKeyType {
    /// Convert to the wire discriminator byte.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Try to parse from the wire discriminator byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Ed25519),
            _ => None,
        }
    }
}

/// Length of an Ed25519 owner public encoding (type byte + key).
pub const OWNER_ED25519_PUBLIC_SIZE: usize = 33;

/// Fill a buffer with cryptographically secure random bytes.
pub fn secure_random(buf: &mut [u8]) {
    OsRng.fill_bytes(buf);
}

/// An owner key pair (signing side).
#[derive(Clone)]
pub struct Owner {
    signing_key: SigningKey,
}

impl Owner {
    /// Generate a new random owner.
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        secure_random(&mut seed);
        Self::from_seed(&seed)
    }

    /// Derive an owner deterministically from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Reconstruct an owner from its private key bytes.
    pub fn from_private_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::InvalidParameter("owner private key must be 32 bytes"))?;
        Ok(Self::from_seed(&seed))
    }

    /// Private key bytes (secret material).
    pub fn private_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// The owner's key type.
    pub fn key_type(&self) -> OwnerKeyType {
        OwnerKeyType::Ed25519
    }

    /// Stable wire encoding of the public key, embedded in record bodies.
    pub fn public_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(OWNER_ED25519_PUBLIC_SIZE);
        out.push(OwnerKeyType::Ed25519.as_u8());
        out.extend_from_slice(self.signing_key.verifying_key().as_bytes());
        out
    }

    /// Sign a 32-byte message hash.
    pub fn sign(&self, message: &[u8; 32]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }

    /// The verification half of this owner.
    pub fn to_public(&self) -> OwnerPublic {
        OwnerPublic {
            key_type: OwnerKeyType::Ed25519,
            verifying_key: self.signing_key.verifying_key(),
        }
    }
}

impl fmt::Debug for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Owner({:?}, {})",
            self.key_type(),
            &hex::encode(self.signing_key.verifying_key().as_bytes())[..16]
        )
    }
}

/// The verification half of an owner, reconstructed from public bytes.
#[derive(Clone)]
pub struct OwnerPublic {
    key_type: OwnerKeyType,
    verifying_key: VerifyingKey,
}

impl OwnerPublic {
    /// Parse owner public bytes (type byte followed by key material).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let (&type_byte, key) = bytes
            .split_first()
            .ok_or(Error::InvalidParameter("owner public bytes are empty"))?;
        match OwnerKeyType::from_u8(type_byte) {
            Some(OwnerKeyType::Ed25519) => {
                let key: [u8; 32] = key
                    .try_into()
                    .map_err(|_| Error::InvalidParameter("bad owner public key length"))?;
                let verifying_key = VerifyingKey::from_bytes(&key)
                    .map_err(|_| Error::InvalidParameter("bad owner public key"))?;
                Ok(Self {
                    key_type: OwnerKeyType::Ed25519,
                    verifying_key,
                })
            }
            None => Err(Error::InvalidParameter("unknown owner key type")),
        }
    }

    /// The owner's key type.
    pub fn key_type(&self) -> OwnerKeyType {
        self.key_type
    }

    /// Stable wire encoding of the public key.
    pub fn bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(OWNER_ED25519_PUBLIC_SIZE);
        out.push(self.key_type.as_u8());
        out.extend_from_slice(self.verifying_key.as_bytes());
        out
    }

    /// Verify a signature over a 32-byte message hash.
    pub fn verify(&self, message: &[u8; 32], signature: &[u8]) -> bool {
        let Ok(sig) = Signature::from_slice(signature) else {
            return false;
        };
        self.verifying_key.verify(message, &sig).is_ok()
    }
}

impl fmt::Debug for OwnerPublic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OwnerPublic({:?}, {})",
            self.key_type,
            &hex::encode(self.verifying_key.as_bytes())[..16]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let owner = Owner::generate();
        let message = [0x11u8; 32];
        let signature = owner.sign(&message);

        let public = OwnerPublic::from_bytes(&owner.public_bytes()).unwrap();
        assert!(public.verify(&message, &signature));

        let mut tampered = message;
        tampered[0] ^= 0x01;
        assert!(!public.verify(&tampered, &signature));
    }

    #[test]
    fn test_deterministic_from_seed() {
        let seed = [0x42u8; 32];
        let a = Owner::from_seed(&seed);
        let b = Owner::from_seed(&seed);
        assert_eq!(a.public_bytes(), b.public_bytes());
        assert_eq!(a.sign(&[7u8; 32]), b.sign(&[7u8; 32]));
    }

    #[test]
    fn test_public_bytes_roundtrip() {
        let owner = Owner::generate();
        let bytes = owner.public_bytes();
        assert_eq!(bytes.len(), OWNER_ED25519_PUBLIC_SIZE);
        assert_eq!(bytes[0], OwnerKeyType::Ed25519.as_u8());

        let public = OwnerPublic::from_bytes(&bytes).unwrap();
        assert_eq!(public.bytes(), bytes);
        assert_eq!(public.key_type(), OwnerKeyType::Ed25519);
    }

    #[test]
    fn test_private_bytes_roundtrip() {
        let owner = Owner::generate();
        let recovered = Owner::from_private_bytes(&owner.private_bytes()).unwrap();
        assert_eq!(owner.public_bytes(), recovered.public_bytes());
    }

    #[test]
    fn test_reject_bad_public_bytes() {
        assert!(OwnerPublic::from_bytes(&[]).is_err());
        assert!(OwnerPublic::from_bytes(&[0x7f; 33]).is_err());
        assert!(OwnerPublic::from_bytes(&[0x01; 5]).is_err());
    }

    #[test]
    fn test_bad_signature_length_rejected() {
        let owner = Owner::generate();
        let public = owner.to_public();
        assert!(!public.verify(&[0u8; 32], &[0u8; 12]));
        assert!(!public.verify(&[0u8; 32], &[]));
    }

    #[test]
    fn test_secure_random_fills() {
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        secure_random(&mut a);
        secure_random(&mut b);
        assert_ne!(a, b);
    }
}
