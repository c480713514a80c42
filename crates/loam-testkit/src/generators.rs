//! Proptest generators for record-core property tests.

use proptest::prelude::*;

use loam_core::{Owner, Record, RecordBuilder, RecordHash, WorkAlgorithm};

/// Generate a deterministic owner from a random seed.
pub fn owner() -> impl Strategy<Value = Owner> {
    any::<[u8; 32]>().prop_map(|seed| Owner::from_seed(&seed))
}

/// Generate a random record hash.
pub fn record_hash() -> impl Strategy<Value = RecordHash> {
    any::<[u8; 32]>().prop_map(RecordHash::from_bytes)
}

/// Generate value bytes up to `max_len`.
pub fn value(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a non-empty selector name.
pub fn selector_name() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..=32)
}

/// Generate a timestamp in seconds.
pub fn timestamp() -> impl Strategy<Value = u64> {
    0u64..=u64::MAX / 2
}

/// Inputs for building one record with work algorithm `None`.
#[derive(Debug, Clone)]
pub struct RecordParams {
    pub seed: [u8; 32],
    pub value: Vec<u8>,
    pub masking_key: Vec<u8>,
    pub selectors: Vec<(Vec<u8>, u64)>,
    pub links: Vec<RecordHash>,
    pub timestamp: u64,
}

/// Generate record-construction inputs.
pub fn record_params() -> impl Strategy<Value = RecordParams> {
    (
        any::<[u8; 32]>(),
        value(512),
        prop::collection::vec(any::<u8>(), 0..=16),
        prop::collection::vec((selector_name(), any::<u64>()), 0..=4),
        prop::collection::vec(record_hash(), 0..=4),
        timestamp(),
    )
        .prop_map(
            |(seed, value, masking_key, selectors, links, timestamp)| RecordParams {
                seed,
                value,
                masking_key,
                selectors,
                links,
                timestamp,
            },
        )
}

/// Build the record described by `params`.
pub fn record_from_params(params: &RecordParams) -> Record {
    let owner = Owner::from_seed(&params.seed);
    let mut builder = RecordBuilder::new()
        .value(params.value.clone())
        .masking_key(params.masking_key.clone())
        .timestamp(params.timestamp);
    for (name, ordinal) in &params.selectors {
        builder = builder.selector(name.clone(), *ordinal);
    }
    for link in &params.links {
        builder = builder.link(*link);
    }
    builder
        .build(&owner, WorkAlgorithm::None, 0, None)
        .expect("record construction")
}
