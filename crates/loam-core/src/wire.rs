//! Record wire codec.
//!
//! The serialized form is canonical: record hashes and owner signatures
//! are computed over these exact bytes, so the encoding must be bit-stable
//! across implementations. Varints are unsigned LEB128; fixed-width
//! integers inside hashed streams are big-endian. Every length prefix is
//! checked against the record size bound before any allocation happens.

use crate::error::Error;
use crate::hash::RecordHash;
use crate::record::{Record, RecordBody, WorkAlgorithm, BODY_FLAG_HAS_CERTIFICATE, RECORD_VERSION};
use crate::selector::Selector;
use crate::work::WHARRGARBL_WORK_SIZE;
use crate::RECORD_MAX_SIZE;

/// First byte of a dead slot in a flat record file.
///
/// Valid records always start with the version byte, which is never
/// `0xff`, so the sentinel is unambiguous.
pub const TOMBSTONE_SENTINEL: u8 = 0xff;

pub(crate) fn write_uvarint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

pub(crate) fn uvarint_len(value: u64) -> usize {
    if value == 0 {
        1
    } else {
        (70 - value.leading_zeros() as usize) / 7
    }
}

/// Bounds-checked cursor over a byte slice.
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Start reading at the beginning of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, Error> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or(Error::RecordInvalid("unexpected end of input"))?;
        self.pos += 1;
        Ok(byte)
    }

    pub(crate) fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], Error> {
        if self.remaining() < len {
            return Err(Error::RecordInvalid("unexpected end of input"));
        }
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub(crate) fn read_array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub(crate) fn read_uvarint(&mut self) -> Result<u64, Error> {
        let mut value: u64 = 0;
        for shift in (0..64).step_by(7) {
            let byte = self.read_u8()?;
            if shift == 63 && byte > 1 {
                return Err(Error::RecordInvalid("varint overflow"));
            }
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(Error::RecordInvalid("varint overflow"))
    }

    fn skip(&mut self, len: usize) {
        self.pos = (self.pos + len).min(self.data.len());
    }
}

pub(crate) fn marshal_body(body: &RecordBody, out: &mut Vec<u8>) {
    let mut flags = 0u8;
    if body.certificate.is_some() {
        flags |= BODY_FLAG_HAS_CERTIFICATE;
    }
    out.push(flags);

    write_uvarint(out, body.masked_value.len() as u64);
    out.extend_from_slice(&body.masked_value);

    write_uvarint(out, body.owner.len() as u64);
    out.extend_from_slice(&body.owner);

    if let Some(certificate) = &body.certificate {
        out.extend_from_slice(certificate.as_bytes());
    }

    write_uvarint(out, body.link_count() as u64);
    out.extend_from_slice(&body.links);

    write_uvarint(out, body.timestamp);
}

pub(crate) fn body_size(body: &RecordBody) -> usize {
    1 + uvarint_len(body.masked_value.len() as u64)
        + body.masked_value.len()
        + uvarint_len(body.owner.len() as u64)
        + body.owner.len()
        + if body.certificate.is_some() { 32 } else { 0 }
        + uvarint_len(body.link_count() as u64)
        + body.links.len()
        + uvarint_len(body.timestamp)
}

pub(crate) fn unmarshal_body(reader: &mut ByteReader<'_>) -> Result<RecordBody, Error> {
    let flags = reader.read_u8()?;

    let value_len = reader.read_uvarint()?;
    if value_len > RECORD_MAX_SIZE as u64 {
        return Err(Error::RecordInvalid("masked value length"));
    }
    let masked_value = reader.read_bytes(value_len as usize)?.to_vec();

    let owner_len = reader.read_uvarint()?;
    if owner_len > RECORD_MAX_SIZE as u64 {
        return Err(Error::RecordInvalid("owner length"));
    }
    let owner = reader.read_bytes(owner_len as usize)?.to_vec();

    let certificate = if flags & BODY_FLAG_HAS_CERTIFICATE != 0 {
        Some(RecordHash::from_bytes(reader.read_array::<32>()?))
    } else {
        None
    };

    let link_count = reader.read_uvarint()?;
    if link_count > (RECORD_MAX_SIZE / 32) as u64 {
        return Err(Error::RecordInvalid("link count"));
    }
    let links = reader.read_bytes(link_count as usize * 32)?.to_vec();

    let timestamp = reader.read_uvarint()?;

    Ok(RecordBody {
        masked_value,
        owner,
        certificate,
        links,
        timestamp,
    })
}

pub(crate) fn marshal_record(record: &Record, out: &mut Vec<u8>) {
    out.push(RECORD_VERSION);
    marshal_body(&record.body, out);

    write_uvarint(out, record.selectors.len() as u64);
    for selector in &record.selectors {
        selector.marshal_to(out);
    }

    out.push(record.work_algorithm.as_u8());
    out.extend_from_slice(&record.work);

    write_uvarint(out, record.signature.len() as u64);
    out.extend_from_slice(&record.signature);
}

/// Decode one record from the reader.
///
/// A leading `0xff` marks a dead slot in a flat record file: the four
/// bytes after the sentinel hold the slot's total length big-endian, and
/// the reader is advanced past the whole slot before
/// [`Error::MarkedIgnore`] is returned, so a scan can continue at the next
/// slot.
pub fn read_record(reader: &mut ByteReader<'_>) -> Result<Record, Error> {
    let start = reader.position();

    let header = reader.read_u8()?;
    if header == TOMBSTONE_SENTINEL {
        let length = u32::from_be_bytes(reader.read_array::<4>()?);
        if length > 5 {
            reader.skip(length as usize - 5);
        }
        return Err(Error::MarkedIgnore);
    }
    if header != RECORD_VERSION {
        return Err(Error::RecordInvalid("unknown version byte"));
    }

    let body = unmarshal_body(reader)?;

    let selector_count = reader.read_uvarint()?;
    if selector_count > (RECORD_MAX_SIZE / 64) as u64 {
        return Err(Error::RecordInvalid("selector count"));
    }
    let mut selectors = Vec::with_capacity(selector_count as usize);
    for _ in 0..selector_count {
        selectors.push(Selector::unmarshal(reader)?);
    }

    let algorithm_byte = reader.read_u8()?;
    let work_algorithm =
        WorkAlgorithm::from_u8(algorithm_byte).ok_or(Error::UnsupportedAlgorithm(algorithm_byte))?;
    let work = match work_algorithm {
        WorkAlgorithm::None => Vec::new(),
        WorkAlgorithm::Wharrgarbl => reader.read_bytes(WHARRGARBL_WORK_SIZE)?.to_vec(),
    };

    let signature_len = reader.read_uvarint()?;
    if signature_len > RECORD_MAX_SIZE as u64 {
        return Err(Error::RecordInvalid("signature length"));
    }
    let signature = reader.read_bytes(signature_len as usize)?.to_vec();

    let size = reader.position() - start;
    if size > RECORD_MAX_SIZE {
        return Err(Error::RecordTooLarge(size));
    }

    Ok(Record::from_parts(
        body,
        selectors,
        work,
        work_algorithm,
        signature,
    ))
}
