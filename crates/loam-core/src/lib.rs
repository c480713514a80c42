//! # loam-core
//!
//! Record core for **loam**, a fully decentralized, fully replicated
//! key/value store. Every participating node stores the whole data set;
//! writes are self-authenticating records stitched into a DAG by hash
//! links, and reads are key lookups against selector-derived indexes.
//!
//! This crate defines what a record *is*: construction, value masking,
//! selector claims, proof-of-work rate limiting, the canonical wire form,
//! and the ingestion validator. It is pure computation — no I/O, no
//! storage, no networking. Gossip, persistence, and query surfaces live
//! in other crates.
//!
//! ## Key types
//!
//! - [`Record`] - the immutable unit of storage
//! - [`RecordBuilder`] / [`RecordStart`] / [`RecordWorked`] - three-phase
//!   assembly, so proof of work can run on another thread or machine
//! - [`Selector`] - privacy-preserving record key with a proof-of-knowledge
//!   claim
//! - [`Owner`] - the key pair that signs records
//! - [`validate_record`] - the ingestion validator
//!
//! ## Example
//!
//! ```
//! use loam_core::{validate_record, Owner, RecordBuilder, WorkAlgorithm};
//!
//! let owner = Owner::from_seed(&[7u8; 32]);
//! let record = RecordBuilder::new()
//!     .value(b"hello".to_vec())
//!     .masking_key(b"name".to_vec())
//!     .selector(b"greeting".to_vec(), 0)
//!     .timestamp(1_000_000)
//!     .build(&owner, WorkAlgorithm::None, 0, None)
//!     .unwrap();
//!
//! assert!(validate_record(&record).is_ok());
//! assert_eq!(record.body.get_value(b"name"), b"hello");
//! ```
//!
//! Records are immutable and safe to share across threads once built; the
//! serialized bytes, hash, and id are each computed once and cached.

pub mod error;
pub mod hash;
pub mod mask;
pub mod owner;
pub mod record;
pub mod selector;
pub mod validation;
pub mod wire;
pub mod work;

pub use error::{Error, ValidationError};
pub use hash::{body_digest, work_digest, BodyDigest, RecordHash, RecordId, WorkDigest};
pub use mask::{mask_value, unmask_value};
pub use owner::{secure_random, Owner, OwnerKeyType, OwnerPublic, OWNER_ED25519_PUBLIC_SIZE};
pub use record::{
    Record, RecordBody, RecordBuilder, RecordStart, RecordWorked, WorkAlgorithm, RECORD_VERSION,
};
pub use selector::{selector_key, Selector, SELECTOR_KEY_SIZE, SELECTOR_ORDINAL_SIZE};
pub use validation::validate_record;
pub use wire::{read_record, ByteReader, TOMBSTONE_SENTINEL};
pub use work::{
    solve_work, wharrgarbl_cost, wharrgarbl_difficulty, wharrgarbl_score, wharrgarbl_solve,
    wharrgarbl_verify, CancelToken, DEFAULT_WHARRGARBL_MEMORY, WHARRGARBL_WORK_SIZE,
};

/// Global maximum serialized record size in bytes.
///
/// A sanity bound more than a protocol constant: it caps every length
/// prefix before allocation and keeps flat-file slots enumerable.
pub const RECORD_MAX_SIZE: usize = 65536;
