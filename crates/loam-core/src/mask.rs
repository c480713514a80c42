//! Value masking.
//!
//! Values are optionally LZW-compressed, tagged with a one-byte flag, and
//! encrypted with AES-256-CFB. The record is authenticated by the owner
//! signature, so the value cipher needs neither AEAD nor random IVs: the
//! (timestamp, owner) pair keeps the IV unique for an honest writer. The
//! AES key is SHA-256 of the caller's masking key, SHA-256 being the most
//! widely available choice for other implementations to match.

use aes::Aes256;
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
use cfb_mode::{Decryptor, Encryptor};
use sha2::{Digest, Sha256};
use weezl::{decode as lzw_decode, encode as lzw_encode, BitOrder};

use crate::RECORD_MAX_SIZE;

const FLAG_RAW: u8 = 0x00;
const FLAG_COMPRESSED: u8 = 0x01;

/// Values shorter than this are never worth a compression attempt.
const COMPRESSION_THRESHOLD: usize = 16;

fn cipher_key(masking_key: &[u8]) -> [u8; 32] {
    Sha256::digest(masking_key).into()
}

fn cipher_iv(timestamp: u64, owner_public: &[u8]) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[0..8].copy_from_slice(&timestamp.to_be_bytes());
    let n = owner_public.len().min(8);
    iv[8..8 + n].copy_from_slice(&owner_public[..n]);
    iv
}

/// Mask a plaintext value for inclusion in a record body.
///
/// The value is LZW-compressed when it is long enough and compression
/// actually shrinks it (flag byte included); the first plaintext byte
/// records which branch was taken. An empty value stays empty.
pub fn mask_value(value: &[u8], masking_key: &[u8], timestamp: u64, owner_public: &[u8]) -> Vec<u8> {
    if value.is_empty() {
        return Vec::new();
    }

    let mut masked = Vec::with_capacity(value.len() + 1);
    if value.len() >= COMPRESSION_THRESHOLD {
        let mut encoder = lzw_encode::Encoder::new(BitOrder::Lsb, 8);
        if let Ok(compressed) = encoder.encode(value) {
            if compressed.len() + 1 < value.len() {
                masked.push(FLAG_COMPRESSED);
                masked.extend_from_slice(&compressed);
            }
        }
    }
    if masked.is_empty() {
        masked.push(FLAG_RAW);
        masked.extend_from_slice(value);
    }

    let key = cipher_key(masking_key);
    let iv = cipher_iv(timestamp, owner_public);
    Encryptor::<Aes256>::new(&key.into(), &iv.into()).encrypt(&mut masked);
    masked
}

/// Unmask a record value.
///
/// Decompression failure yields an empty value rather than an error; a
/// wrong masking key simply produces garbage, since nothing here
/// authenticates the key.
pub fn unmask_value(
    masked: &[u8],
    masking_key: &[u8],
    timestamp: u64,
    owner_public: &[u8],
) -> Vec<u8> {
    if masked.is_empty() {
        return Vec::new();
    }

    let mut plain = masked.to_vec();
    let key = cipher_key(masking_key);
    let iv = cipher_iv(timestamp, owner_public);
    Decryptor::<Aes256>::new(&key.into(), &iv.into()).decrypt(&mut plain);

    if plain[0] & FLAG_COMPRESSED != 0 {
        decompress(&plain[1..]).unwrap_or_default()
    } else {
        plain[1..].to_vec()
    }
}

/// LZW-decompress with the output capped at the record size bound.
fn decompress(data: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    let status = {
        let mut decoder = lzw_decode::Decoder::new(BitOrder::Lsb, 8);
        let mut stream = decoder.into_stream(CappedWriter {
            out: &mut out,
            limit: RECORD_MAX_SIZE,
        });
        stream.decode_all(data).status
    };
    status.ok()?;
    Some(out)
}

struct CappedWriter<'a> {
    out: &'a mut Vec<u8>,
    limit: usize,
}

impl std::io::Write for CappedWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.out.len() + buf.len() > self.limit {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "decompressed value exceeds the record size bound",
            ));
        }
        self.out.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
