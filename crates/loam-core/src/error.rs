//! Error types for the record core.

use thiserror::Error;

use crate::RECORD_MAX_SIZE;

/// Errors from record construction, encoding, and decoding.
#[derive(Debug, Error)]
pub enum Error {
    /// The byte stream is not a well-formed record.
    #[error("record is invalid: {0}")]
    RecordInvalid(&'static str),

    /// Serialized record exceeds the global size bound.
    #[error("record too large: {0} bytes (max {max})", max = RECORD_MAX_SIZE)]
    RecordTooLarge(usize),

    /// Work algorithm byte is not recognized.
    #[error("unsupported work algorithm: {0:#04x}")]
    UnsupportedAlgorithm(u8),

    /// The slot holds a tombstone, not a record; skip and reuse it.
    #[error("record slot is marked ignore")]
    MarkedIgnore,

    /// A caller-supplied parameter is out of range or inconsistent.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// Proof of work did not produce a usable result.
    #[error("proof of work failed")]
    WorkFailed,

    /// Proof of work was cancelled before completion.
    #[error("proof of work aborted")]
    WorkAborted,
}

/// Errors from ingestion validation.
///
/// Each authentication failure is a distinct kind so callers can tell
/// tampering from corruption in their own telemetry.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A selector's claim signature does not verify against the chained
    /// claim hash at its position.
    #[error("selector {index} claim check failed")]
    SelectorClaimCheckFailed { index: usize },

    /// The attached work does not meet the cost of the billable bytes.
    #[error("work does not meet the required cost")]
    InsufficientWork,

    /// The owner public bytes are missing or the signature does not verify.
    #[error("owner signature check failed")]
    OwnerSignatureCheckFailed,

    /// A panic escaped a verification step and was contained.
    #[error("validation panicked: {0}")]
    ValidationPanic(String),
}
