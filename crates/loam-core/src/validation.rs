//! Ingestion validation.
//!
//! Validation recomputes every binding in a received record: each selector
//! claim against the chained body hash, the work against the recomputed
//! work hash and the cost of the billable bytes, and the owner signature
//! over the final hash. A record that fails any step is discarded by the
//! caller; nothing here retries or logs.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::ValidationError;
use crate::hash::WorkDigest;
use crate::owner::OwnerPublic;
use crate::record::{Record, WorkAlgorithm};
use crate::work::{wharrgarbl_cost, wharrgarbl_verify};

/// Check a record's selector claims, work, and owner signature.
///
/// A panic escaping any verification step is contained and surfaced as a
/// validation error; the validator never takes the ingesting process down.
pub fn validate_record(record: &Record) -> Result<(), ValidationError> {
    match catch_unwind(AssertUnwindSafe(|| validate_inner(record))) {
        Ok(result) => result,
        Err(panic) => Err(ValidationError::ValidationPanic(panic_message(panic))),
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn validate_inner(record: &Record) -> Result<(), ValidationError> {
    if record.body.owner.is_empty() {
        return Err(ValidationError::OwnerSignatureCheckFailed);
    }

    let mut claim_hash = record.body.signing_hash();
    let mut billable_bytes = record.body.size_bytes();
    let mut work_hasher = WorkDigest::new();
    work_hasher.update(&claim_hash);

    for (index, selector) in record.selectors.iter().enumerate() {
        if !selector.verify_claim(&claim_hash) {
            return Err(ValidationError::SelectorClaimCheckFailed { index });
        }
        let selector_bytes = selector.to_bytes();
        work_hasher.update(&selector_bytes);
        billable_bytes += selector_bytes.len();

        let mut chain = WorkDigest::new();
        chain.update(&claim_hash);
        chain.update(&selector_bytes);
        claim_hash = chain.finalize();
    }
    let work_hash = work_hasher.finalize();

    match record.work_algorithm {
        // acceptability of workless records is network policy, not ours
        WorkAlgorithm::None => {}
        WorkAlgorithm::Wharrgarbl => {
            if wharrgarbl_verify(&record.work, &work_hash) < wharrgarbl_cost(billable_bytes) {
                return Err(ValidationError::InsufficientWork);
            }
        }
    }

    let mut digest = WorkDigest::new();
    digest.update(&work_hash);
    digest.update(&record.work);
    digest.update(&[record.work_algorithm.as_u8()]);
    let signing_hash = digest.finalize();

    let owner = OwnerPublic::from_bytes(&record.body.owner)
        .map_err(|_| ValidationError::OwnerSignatureCheckFailed)?;
    if !owner.verify(&signing_hash, &record.signature) {
        return Err(ValidationError::OwnerSignatureCheckFailed);
    }

    Ok(())
}
