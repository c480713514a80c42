//! End-to-end record scenarios: build, serialize, validate, tamper.

use loam_core::{
    validate_record, wharrgarbl_solve, CancelToken, Error, Owner, Record, RecordBuilder,
    ValidationError, WorkAlgorithm, RECORD_MAX_SIZE,
};
use loam_testkit::TestFixture;

/// Memory budget for in-test proof of work; real nodes use hundreds of MiB.
const TEST_WORK_MEMORY: usize = 1024 * 1024;

fn zero_seed_owner() -> Owner {
    Owner::from_seed(&[0u8; 32])
}

fn worked_record() -> Record {
    RecordBuilder::new()
        .value(b"hello".to_vec())
        .masking_key(b"k".to_vec())
        .selector(b"foo".to_vec(), 0)
        .selector(b"bar".to_vec(), 7)
        .timestamp(1_000_000)
        .build(
            &zero_seed_owner(),
            WorkAlgorithm::Wharrgarbl,
            TEST_WORK_MEMORY,
            None,
        )
        .unwrap()
}

#[test]
fn test_create_verify_with_work() {
    let record = worked_record();

    let bytes = record.to_bytes();
    assert!(bytes.len() <= RECORD_MAX_SIZE);

    let decoded = Record::from_bytes(&bytes).unwrap();
    assert_eq!(decoded, record);
    assert_eq!(decoded.to_bytes(), bytes);

    assert!(validate_record(&decoded).is_ok());
    assert!(decoded.score() > 0);
    assert_eq!(decoded.body.get_value(b"k"), b"hello");
    assert_ne!(decoded.body.get_value(b"wrong"), b"hello".to_vec());
}

#[test]
fn test_tampered_value_rejected() {
    let record = worked_record();
    let mut bytes = record.to_bytes().to_vec();

    // version, body flags, masked value length, then the masked value
    bytes[3] ^= 0x01;

    let decoded = Record::from_bytes(&bytes).unwrap();
    assert!(validate_record(&decoded).is_err());
}

#[test]
fn test_swapped_selectors_rejected() {
    let record = worked_record();
    let mut bytes = record.to_bytes().to_vec();

    let selector_offset = 1 + record.body.size_bytes() + 1;
    let selector_len = record.selectors[0].to_bytes().len();
    assert_eq!(selector_len, record.selectors[1].to_bytes().len());

    let first = bytes[selector_offset..selector_offset + selector_len].to_vec();
    let second =
        bytes[selector_offset + selector_len..selector_offset + 2 * selector_len].to_vec();
    bytes[selector_offset..selector_offset + selector_len].copy_from_slice(&second);
    bytes[selector_offset + selector_len..selector_offset + 2 * selector_len]
        .copy_from_slice(&first);

    let decoded = Record::from_bytes(&bytes).unwrap();
    assert!(matches!(
        validate_record(&decoded),
        Err(ValidationError::SelectorClaimCheckFailed { index: 0 })
    ));
}

#[test]
fn test_stripped_work_rejected() {
    let record = worked_record();
    let mut bytes = record.to_bytes().to_vec();

    // algorithm byte sits before work (20), signature varint (1), and
    // signature (64)
    let algorithm_offset = bytes.len() - 86;
    assert_eq!(bytes[algorithm_offset], WorkAlgorithm::Wharrgarbl.as_u8());
    bytes[algorithm_offset] = WorkAlgorithm::None.as_u8();

    match Record::from_bytes(&bytes) {
        Err(_) => {}
        Ok(decoded) => assert!(validate_record(&decoded).is_err()),
    }
}

#[test]
fn test_remote_work_phases() {
    let owner = zero_seed_owner();
    let started = RecordBuilder::new()
        .value(b"hello".to_vec())
        .masking_key(b"k".to_vec())
        .selector(b"foo".to_vec(), 0)
        .timestamp(1_000_000)
        .start(&owner.public_bytes())
        .unwrap();

    // phase 2 as a remote solver would run it: only the work hash and the
    // cost leave the building
    let (work, _iterations) =
        wharrgarbl_solve(started.work_hash(), started.cost(), TEST_WORK_MEMORY, None).unwrap();

    let record = started
        .attach_work(WorkAlgorithm::Wharrgarbl, &work)
        .unwrap()
        .complete(&owner)
        .unwrap();
    assert!(validate_record(&record).is_ok());
}

#[test]
fn test_cancelled_work_aborts_assembly() {
    let token = CancelToken::new();
    token.cancel();

    let started = RecordBuilder::new()
        .value(b"hello".to_vec())
        .timestamp(1)
        .start(&zero_seed_owner().public_bytes())
        .unwrap();
    let result = started.solve(WorkAlgorithm::Wharrgarbl, TEST_WORK_MEMORY, Some(&token));
    assert!(matches!(result, Err(Error::WorkAborted)));
}

#[test]
fn test_oversize_serialization_refused() {
    let mut value = vec![0u8; 65_530];
    loam_core::secure_random(&mut value);

    let result = RecordBuilder::new()
        .value(value)
        .timestamp(1)
        .build(&zero_seed_owner(), WorkAlgorithm::None, 0, None);
    assert!(matches!(result, Err(Error::RecordTooLarge(_))));
}

#[test]
fn test_oversize_value_refused() {
    let result = RecordBuilder::new()
        .value(vec![0u8; RECORD_MAX_SIZE + 1])
        .timestamp(1)
        .build(&zero_seed_owner(), WorkAlgorithm::None, 0, None);
    assert!(matches!(result, Err(Error::InvalidParameter(_))));
}

#[test]
fn test_short_value_not_compressed() {
    let fixture = TestFixture::with_seed([9; 32]);
    let record = fixture.make_record(b"hi", b"k", &[], 1_000);
    // flag byte plus the two raw bytes
    assert_eq!(record.body.masked_value.len(), 3);
    assert_eq!(record.body.get_value(b"k"), b"hi");
}

#[test]
fn test_large_value_compresses() {
    let fixture = TestFixture::with_seed([9; 32]);
    let value: Vec<u8> = b"abcdefgh".iter().copied().cycle().take(10_000).collect();
    let record = fixture.make_record(&value, b"k", &[], 1_000);
    assert!(record.body.masked_value.len() < 10_000);
    assert_eq!(record.body.get_value(b"k"), value);
}

#[test]
fn test_ids_collide_for_same_selector_sets() {
    let fixture = TestFixture::with_seed([3; 32]);
    let forward = fixture.make_record(b"v", b"", &[(b"a", 1), (b"b", 2)], 5);
    let reversed = fixture.make_record(b"v", b"", &[(b"b", 2), (b"a", 1)], 5);
    assert_eq!(forward.id(), reversed.id());
    assert_ne!(forward.hash(), reversed.hash());
}

#[test]
fn test_workless_record_roundtrip() {
    let fixture = TestFixture::with_seed([4; 32]);
    let record = fixture.make_record(b"value", b"key", &[(b"name", 0)], 42);
    assert_eq!(record.score(), 1);

    let decoded = Record::from_bytes(&record.to_bytes()).unwrap();
    assert_eq!(decoded, record);
    assert!(validate_record(&decoded).is_ok());
}
