//! Proof of work: cost curve, score scaling, and the Wharrgarbl search.
//!
//! Records pay for their size with work. The cost curve is integer-only so
//! every platform computes the exact same figure; it was fit to give a
//! roughly linear time-for-bytes trade under the default search.
//!
//! The search itself is momentum-style: it looks for a pair of nonces
//! whose keyed hashes land within a difficulty-scaled distance of each
//! other in a 64-bit space, using a memory table to turn the hunt into a
//! birthday problem. More memory means fewer hash evaluations per
//! collision, which is the memory-hardness lever.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Error;
use crate::hash::WorkDigest;
use crate::record::WorkAlgorithm;
use crate::RECORD_MAX_SIZE;

/// Serialized size of a Wharrgarbl work product: two 8-byte nonces
/// followed by the big-endian stated difficulty.
pub const WHARRGARBL_WORK_SIZE: usize = 20;

/// Default memory budget for the Wharrgarbl search.
pub const DEFAULT_WHARRGARBL_MEMORY: usize = 384 * 1024 * 1024;

/// Cost of a maximum-size record; scores saturate above this.
const MAX_COST: u32 = 0x0f7b_0000;

/// Cancellation signal for long-running work.
///
/// Clone the token into the solving thread and call [`cancel`] from
/// anywhere; the search checks it periodically.
///
/// [`cancel`]: CancelToken::cancel
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Integer square root with round-to-nearest.
fn integer_sqrt_rounded(value: u32) -> u32 {
    let mut op = u64::from(value);
    let mut result: u64 = 0;
    let mut bit: u64 = 1 << 30;
    while bit > op {
        bit >>= 2;
    }
    while bit != 0 {
        if op >= result + bit {
            op -= result + bit;
            result = (result >> 1) + bit;
        } else {
            result >>= 1;
        }
        bit >>= 2;
    }
    if op > result {
        (result + 1) as u32
    } else {
        result as u32
    }
}

/// Wharrgarbl difficulty required for a record with this many billable
/// bytes.
///
/// Integer-only so the figure is identical on every platform. Byte counts
/// under four would break the curve; no real record is that small, so they
/// get a nominal cost.
pub fn wharrgarbl_cost(billable_bytes: usize) -> u32 {
    if billable_bytes < 4 {
        return billable_bytes as u32 + 1;
    }
    let n = billable_bytes.min(RECORD_MAX_SIZE);
    let b = n as u64 * 3;
    let c = u64::from(integer_sqrt_rounded(b as u32)) * b * 3 - b * 8;
    c.min(u64::from(u32::MAX)) as u32
}

/// Scale a cost into the full u32 range so scores from future algorithms
/// stay comparable with today's.
pub fn wharrgarbl_score(cost: u32) -> u32 {
    if cost > MAX_COST {
        return 0xffff_a8db;
    }
    if cost < 1 {
        return 1;
    }
    let c = u64::from(cost);
    (c * 16 + (c / 10_000) * 5_369) as u32
}

fn collision_hash(input: &[u8; 32], nonce: u64) -> u64 {
    let mut digest = WorkDigest::new();
    digest.update(input);
    digest.update(&nonce.to_be_bytes());
    let sum = digest.finalize();
    let mut first = [0u8; 8];
    first.copy_from_slice(&sum[..8]);
    u64::from_be_bytes(first)
}

fn bucket_width(difficulty: u32) -> u64 {
    u64::MAX / u64::from(difficulty.max(1))
}

/// Search for a collision meeting `difficulty` over `input`.
///
/// Returns the work bytes and the number of hash evaluations spent, or
/// `None` if the token was cancelled first. Memory is a table budget in
/// bytes; tiny budgets still terminate, just with more iterations.
pub fn wharrgarbl_solve(
    input: &[u8; 32],
    difficulty: u32,
    memory: usize,
    cancel: Option<&CancelToken>,
) -> Option<([u8; WHARRGARBL_WORK_SIZE], u64)> {
    let width = bucket_width(difficulty);
    let slots = (memory / 16).max(64);
    let mut table = vec![(0u64, 0u64); slots];
    let mut nonce = rand::random::<u64>();
    let mut iterations: u64 = 0;

    loop {
        if iterations % 4096 == 0 {
            if let Some(token) = cancel {
                if token.is_cancelled() {
                    return None;
                }
            }
        }

        let hash = collision_hash(input, nonce);
        let slot = ((hash / width) % slots as u64) as usize;
        let (stored_hash, stored_nonce) = table[slot];
        if stored_nonce != nonce && hash.abs_diff(stored_hash) <= width {
            // the slot may still hold its zeroed initial entry
            if collision_hash(input, stored_nonce) == stored_hash {
                let mut out = [0u8; WHARRGARBL_WORK_SIZE];
                out[0..8].copy_from_slice(&stored_nonce.to_be_bytes());
                out[8..16].copy_from_slice(&nonce.to_be_bytes());
                out[16..20].copy_from_slice(&difficulty.to_be_bytes());
                return Some((out, iterations + 1));
            }
        }
        table[slot] = (hash, nonce);
        nonce = nonce.wrapping_add(1);
        iterations += 1;
    }
}

/// Verify work against its input hash.
///
/// Returns the achieved difficulty, or 0 when the work is malformed or
/// the nonces do not usefully collide.
pub fn wharrgarbl_verify(work: &[u8], input: &[u8; 32]) -> u32 {
    if work.len() != WHARRGARBL_WORK_SIZE {
        return 0;
    }
    let mut a = [0u8; 8];
    let mut b = [0u8; 8];
    a.copy_from_slice(&work[0..8]);
    b.copy_from_slice(&work[8..16]);
    let (a, b) = (u64::from_be_bytes(a), u64::from_be_bytes(b));
    if a == b {
        return 0;
    }
    let distance = collision_hash(input, a)
        .abs_diff(collision_hash(input, b))
        .max(1);
    (u64::MAX / distance).min(u64::from(u32::MAX)) as u32
}

/// Stated difficulty carried in the work bytes, used for scoring.
pub fn wharrgarbl_difficulty(work: &[u8]) -> u32 {
    if work.len() != WHARRGARBL_WORK_SIZE {
        return 0;
    }
    let mut stated = [0u8; 4];
    stated.copy_from_slice(&work[16..20]);
    u32::from_be_bytes(stated)
}

/// Run phase 2 of record assembly: compute work for the given algorithm
/// over the phase-1 work hash.
pub fn solve_work(
    algorithm: WorkAlgorithm,
    work_hash: &[u8; 32],
    billable_bytes: usize,
    memory: usize,
    cancel: Option<&CancelToken>,
) -> Result<Vec<u8>, Error> {
    match algorithm {
        WorkAlgorithm::None => Ok(Vec::new()),
        WorkAlgorithm::Wharrgarbl => {
            let (work, _iterations) = wharrgarbl_solve(
                work_hash,
                wharrgarbl_cost(billable_bytes),
                memory,
                cancel,
            )
            .ok_or(Error::WorkAborted)?;
            Ok(work.to_vec())
        }
    }
}
