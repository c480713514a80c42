//! # loam-testkit
//!
//! Test support for the loam record core.
//!
//! - **Fixtures**: deterministic owners and quick record construction for
//!   scenario tests.
//! - **Generators**: proptest strategies for property-based testing of the
//!   codec, masking, and validation paths.
//!
//! Records built here use [`WorkAlgorithm::None`] so suites stay fast;
//! tests that exercise proof of work construct it explicitly.
//!
//! [`WorkAlgorithm::None`]: loam_core::WorkAlgorithm::None

pub mod fixtures;
pub mod generators;

pub use fixtures::TestFixture;
pub use generators::{record_from_params, record_params, RecordParams};
