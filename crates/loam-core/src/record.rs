//! Records: the immutable unit of storage.
//!
//! A record carries a masked value, the owner's public bytes, optional
//! certificate back-reference, hash links to earlier records, and a
//! timestamp, plus the selectors it is indexed under, its proof of work,
//! and the owner signature over all of it.
//!
//! Construction runs in three phases so the expensive middle step can be
//! shipped elsewhere:
//!
//! 1. [`RecordBuilder::start`] masks the value, claims the selectors, and
//!    produces the work target hash. Only the owner's *public* bytes are
//!    needed here.
//! 2. [`RecordStart::solve`] (or any external solver fed the work hash)
//!    computes the proof of work.
//! 3. [`RecordWorked::complete`] signs with the owner's private key and
//!    seals the record.
//!
//! Once sealed a record is read-only; its serialized bytes, hash, and id
//! are computed once and cached, and it can be shared across threads
//! freely.

use bytes::Bytes;
use std::fmt;
use std::sync::OnceLock;

use crate::error::Error;
use crate::hash::{body_digest, BodyDigest, RecordHash, RecordId, WorkDigest};
use crate::mask;
use crate::owner::Owner;
use crate::selector::Selector;
use crate::wire;
use crate::work::{
    solve_work, wharrgarbl_cost, wharrgarbl_difficulty, wharrgarbl_score, CancelToken,
    WHARRGARBL_WORK_SIZE,
};
use crate::RECORD_MAX_SIZE;

/// Version byte at the start of every serialized record.
pub const RECORD_VERSION: u8 = 0x00;

pub(crate) const BODY_FLAG_HAS_CERTIFICATE: u8 = 0x01;

/// Proof-of-work algorithm attached to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkAlgorithm {
    /// No work. Only acceptable on private, certificate-gated networks.
    None = 0x00,
    /// Momentum-style memory-hard collision search.
    Wharrgarbl = 0x01,
}

impl WorkAlgorithm {
    /// Convert to the wire byte.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Try to parse from the wire byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::None),
            0x01 => Some(Self::Wharrgarbl),
            _ => None,
        }
    }
}

/// The immutable payload section of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordBody {
    /// Masked (and possibly compressed) value bytes.
    pub masked_value: Vec<u8>,
    /// Owner public bytes (type byte followed by key material).
    pub owner: Vec<u8>,
    /// Hash of the record holding this owner's certificate, where CAs are
    /// in use. Resolution is the graph layer's job; here it is 32 opaque
    /// bytes.
    pub certificate: Option<RecordHash>,
    /// Concatenated 32-byte hashes of earlier records.
    pub links: Vec<u8>,
    /// Seconds since the Unix epoch; doubles as the revision ordinal.
    pub timestamp: u64,
}

impl RecordBody {
    /// Number of linked records.
    pub fn link_count(&self) -> usize {
        self.links.len() / 32
    }

    /// Iterate over the linked record hashes.
    pub fn links(&self) -> impl Iterator<Item = RecordHash> + '_ {
        self.links.chunks_exact(32).map(|chunk| {
            let mut hash = [0u8; 32];
            hash.copy_from_slice(chunk);
            RecordHash::from_bytes(hash)
        })
    }

    /// Serialized size of the body; these are the first billable bytes.
    pub fn size_bytes(&self) -> usize {
        wire::body_size(self)
    }

    /// Decrypt (and decompress) the value with the caller's masking key.
    pub fn get_value(&self, masking_key: &[u8]) -> Vec<u8> {
        mask::unmask_value(&self.masked_value, masking_key, self.timestamp, &self.owner)
    }

    /// The hash selector claims sign and the work hash chains onto.
    ///
    /// The value goes in through its own digest rather than inline so a
    /// store may eventually drop old value bytes and still authenticate
    /// the record. A zero byte closes every field.
    pub fn signing_hash(&self) -> [u8; 32] {
        let mut digest = BodyDigest::new();
        digest.update(&body_digest(&self.masked_value));
        digest.update(&[0]);
        digest.update(&self.owner);
        digest.update(&[0]);
        if let Some(certificate) = &self.certificate {
            digest.update(certificate.as_bytes());
        }
        digest.update(&[0]);
        digest.update(&self.links);
        digest.update(&[0]);
        digest.update(&self.timestamp.to_be_bytes());
        digest.update(&[0]);
        digest.finalize()
    }
}

/// A complete record: body, selectors, work, and the owner signature.
///
/// Treat records as read-only once constructed. The serialized form,
/// hash, and id are each computed on first use and cached; equality and
/// hashing ignore the caches.
#[derive(Clone)]
pub struct Record {
    /// The record body.
    pub body: RecordBody,
    /// Selectors in creation order. Order is part of the wire form and
    /// the record hash, but not of the id.
    pub selectors: Vec<Selector>,
    /// Proof-of-work output bytes (empty for [`WorkAlgorithm::None`]).
    pub work: Vec<u8>,
    /// The algorithm `work` was produced with.
    pub work_algorithm: WorkAlgorithm,
    /// Owner signature over the final signing hash.
    pub signature: Vec<u8>,

    data: OnceLock<Bytes>,
    hash: OnceLock<RecordHash>,
    id: OnceLock<RecordId>,
}

impl Record {
    pub(crate) fn from_parts(
        body: RecordBody,
        selectors: Vec<Selector>,
        work: Vec<u8>,
        work_algorithm: WorkAlgorithm,
        signature: Vec<u8>,
    ) -> Self {
        Self {
            body,
            selectors,
            work,
            work_algorithm,
            signature,
            data: OnceLock::new(),
            hash: OnceLock::new(),
            id: OnceLock::new(),
        }
    }

    /// Decode a record from its canonical bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut reader = wire::ByteReader::new(bytes);
        wire::read_record(&mut reader)
    }

    /// Canonical serialized bytes (cached).
    pub fn to_bytes(&self) -> Bytes {
        self.data
            .get_or_init(|| {
                let mut out = Vec::with_capacity(self.size_bytes());
                wire::marshal_record(self, &mut out);
                Bytes::from(out)
            })
            .clone()
    }

    /// Serialized size, computed without forcing the byte cache.
    pub fn size_bytes(&self) -> usize {
        if let Some(data) = self.data.get() {
            return data.len();
        }
        1 + self.body.size_bytes()
            + wire::uvarint_len(self.selectors.len() as u64)
            + self
                .selectors
                .iter()
                .map(Selector::size_bytes)
                .sum::<usize>()
            + 1
            + self.work.len()
            + wire::uvarint_len(self.signature.len() as u64)
            + self.signature.len()
    }

    /// The record hash: the body-family digest of the canonical bytes.
    /// This is what links and certificate references point at.
    pub fn hash(&self) -> RecordHash {
        *self
            .hash
            .get_or_init(|| RecordHash::from_bytes(body_digest(&self.to_bytes())))
    }

    /// The record id: the body-family digest over the selector database
    /// keys sorted ascending. With no selectors the id is the record hash.
    pub fn id(&self) -> RecordId {
        *self.id.get_or_init(|| {
            if self.selectors.is_empty() {
                return RecordId::from_bytes(self.hash().0);
            }
            let mut keys: Vec<Vec<u8>> = self.selectors.iter().map(Selector::key).collect();
            keys.sort();
            let mut digest = BodyDigest::new();
            for key in &keys {
                digest.update(key);
            }
            RecordId::from_bytes(digest.finalize())
        })
    }

    /// Work score scaled into u32 for cross-algorithm comparison.
    pub fn score(&self) -> u32 {
        match self.work_algorithm {
            WorkAlgorithm::None => 1,
            WorkAlgorithm::Wharrgarbl => wharrgarbl_score(wharrgarbl_difficulty(&self.work)),
        }
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.body == other.body
            && self.selectors == other.selectors
            && self.work == other.work
            && self.work_algorithm == other.work_algorithm
            && self.signature == other.signature
    }
}

impl Eq for Record {}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("hash", &self.hash())
            .field("timestamp", &self.body.timestamp)
            .field("selectors", &self.selectors.len())
            .field("links", &self.body.link_count())
            .field("work_algorithm", &self.work_algorithm)
            .finish()
    }
}

/// Builder for phase 1 of record assembly.
///
/// Selectors are claimed in the order given; order is part of the
/// record's wire identity (though not of its id).
#[derive(Debug, Clone, Default)]
pub struct RecordBuilder {
    value: Vec<u8>,
    masking_key: Vec<u8>,
    links: Vec<u8>,
    selectors: Vec<(Vec<u8>, u64)>,
    certificate: Option<RecordHash>,
    timestamp: u64,
}

impl RecordBuilder {
    /// Start an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the plaintext value.
    pub fn value(mut self, value: impl Into<Vec<u8>>) -> Self {
        self.value = value.into();
        self
    }

    /// Set the masking key the value is encrypted under.
    pub fn masking_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.masking_key = key.into();
        self
    }

    /// Link to an earlier record by hash.
    pub fn link(mut self, link: RecordHash) -> Self {
        self.links.extend_from_slice(link.as_bytes());
        self
    }

    /// Add a selector by plaintext name and ordinal.
    pub fn selector(mut self, name: impl Into<Vec<u8>>, ordinal: u64) -> Self {
        self.selectors.push((name.into(), ordinal));
        self
    }

    /// Reference the record carrying this owner's certificate.
    pub fn certificate(mut self, certificate: RecordHash) -> Self {
        self.certificate = Some(certificate);
        self
    }

    /// Set the timestamp in seconds since the Unix epoch.
    pub fn timestamp(mut self, seconds: u64) -> Self {
        self.timestamp = seconds;
        self
    }

    /// Phase 1: mask the value, fill the body, claim the selectors in
    /// order, and derive the work target hash.
    pub fn start(self, owner_public: &[u8]) -> Result<RecordStart, Error> {
        if self.value.len() > RECORD_MAX_SIZE {
            return Err(Error::InvalidParameter("value exceeds the record size bound"));
        }
        if owner_public.is_empty() {
            return Err(Error::InvalidParameter("owner public bytes are empty"));
        }

        let body = RecordBody {
            masked_value: mask::mask_value(
                &self.value,
                &self.masking_key,
                self.timestamp,
                owner_public,
            ),
            owner: owner_public.to_vec(),
            certificate: self.certificate,
            links: self.links,
            timestamp: self.timestamp,
        };

        let mut billable_bytes = body.size_bytes();
        let mut claim_hash = body.signing_hash();
        let mut work_hasher = WorkDigest::new();
        work_hasher.update(&claim_hash);

        let mut selectors = Vec::with_capacity(self.selectors.len());
        for (name, ordinal) in &self.selectors {
            let selector = Selector::claim(name, *ordinal, &claim_hash);
            let selector_bytes = selector.to_bytes();
            billable_bytes += selector_bytes.len();
            work_hasher.update(&selector_bytes);

            let mut chain = WorkDigest::new();
            chain.update(&claim_hash);
            chain.update(&selector_bytes);
            claim_hash = chain.finalize();

            selectors.push(selector);
        }

        Ok(RecordStart {
            record: Record::from_parts(
                body,
                selectors,
                Vec::new(),
                WorkAlgorithm::None,
                Vec::new(),
            ),
            work_hash: work_hasher.finalize(),
            billable_bytes,
        })
    }

    /// Run all three phases in one call.
    pub fn build(
        self,
        owner: &Owner,
        algorithm: WorkAlgorithm,
        memory: usize,
        cancel: Option<&CancelToken>,
    ) -> Result<Record, Error> {
        let started = self.start(&owner.public_bytes())?;
        let work = started.solve(algorithm, memory, cancel)?;
        started.attach_work(algorithm, &work)?.complete(owner)
    }
}

/// A record after phase 1: body and selectors fixed, no work or
/// signature yet.
pub struct RecordStart {
    record: Record,
    work_hash: [u8; 32],
    billable_bytes: usize,
}

impl RecordStart {
    /// Target hash for the proof-of-work search.
    pub fn work_hash(&self) -> &[u8; 32] {
        &self.work_hash
    }

    /// Bytes the work cost is charged against.
    pub fn billable_bytes(&self) -> usize {
        self.billable_bytes
    }

    /// Wharrgarbl difficulty this record must reach.
    pub fn cost(&self) -> u32 {
        wharrgarbl_cost(self.billable_bytes)
    }

    /// Phase 2: compute work. This is the expensive step; it can run on a
    /// worker thread or a different machine given only `work_hash` and
    /// the billable byte count.
    pub fn solve(
        &self,
        algorithm: WorkAlgorithm,
        memory: usize,
        cancel: Option<&CancelToken>,
    ) -> Result<Vec<u8>, Error> {
        solve_work(
            algorithm,
            &self.work_hash,
            self.billable_bytes,
            memory,
            cancel,
        )
    }

    /// Attach work (computed here or elsewhere) and derive the final
    /// signing hash.
    pub fn attach_work(self, algorithm: WorkAlgorithm, work: &[u8]) -> Result<RecordWorked, Error> {
        let expected = match algorithm {
            WorkAlgorithm::None => 0,
            WorkAlgorithm::Wharrgarbl => WHARRGARBL_WORK_SIZE,
        };
        if work.len() != expected {
            return Err(Error::InvalidParameter("work length does not match the algorithm"));
        }

        let mut digest = WorkDigest::new();
        digest.update(&self.work_hash);
        digest.update(work);
        digest.update(&[algorithm.as_u8()]);
        let signing_hash = digest.finalize();

        let mut record = self.record;
        record.work = work.to_vec();
        record.work_algorithm = algorithm;
        Ok(RecordWorked {
            record,
            signing_hash,
        })
    }
}

/// A record after phase 2: awaiting the owner signature.
pub struct RecordWorked {
    record: Record,
    signing_hash: [u8; 32],
}

impl RecordWorked {
    /// The hash the owner must sign.
    pub fn signing_hash(&self) -> &[u8; 32] {
        &self.signing_hash
    }

    /// Phase 3: sign with the owner's private key and seal the record.
    pub fn complete(self, owner: &Owner) -> Result<Record, Error> {
        let mut record = self.record;
        record.signature = owner.sign(&self.signing_hash);
        let size = record.size_bytes();
        if size > RECORD_MAX_SIZE {
            return Err(Error::RecordTooLarge(size));
        }
        Ok(record)
    }
}
