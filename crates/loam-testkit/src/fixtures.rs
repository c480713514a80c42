//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use loam_core::{Owner, Record, RecordBuilder, RecordHash, WorkAlgorithm};

/// A fixture holding an owner to build records with.
pub struct TestFixture {
    pub owner: Owner,
}

impl TestFixture {
    /// Create a fixture with a random owner.
    pub fn new() -> Self {
        Self {
            owner: Owner::generate(),
        }
    }

    /// Create a fixture with a deterministic owner.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self {
            owner: Owner::from_seed(&seed),
        }
    }

    /// The owner's public bytes as embedded in record bodies.
    pub fn owner_public(&self) -> Vec<u8> {
        self.owner.public_bytes()
    }

    /// Build a record without proof of work (the fast path for tests).
    pub fn make_record(
        &self,
        value: &[u8],
        masking_key: &[u8],
        selectors: &[(&[u8], u64)],
        timestamp: u64,
    ) -> Record {
        let mut builder = RecordBuilder::new()
            .value(value.to_vec())
            .masking_key(masking_key.to_vec())
            .timestamp(timestamp);
        for (name, ordinal) in selectors {
            builder = builder.selector(name.to_vec(), *ordinal);
        }
        builder
            .build(&self.owner, WorkAlgorithm::None, 0, None)
            .expect("record construction")
    }

    /// Build a record linking to earlier records.
    pub fn make_linked_record(
        &self,
        value: &[u8],
        links: &[RecordHash],
        timestamp: u64,
    ) -> Record {
        let mut builder = RecordBuilder::new().value(value.to_vec()).timestamp(timestamp);
        for link in links {
            builder = builder.link(*link);
        }
        builder
            .build(&self.owner, WorkAlgorithm::None, 0, None)
            .expect("record construction")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loam_core::validate_record;

    #[test]
    fn test_fixture_records_validate() {
        let fixture = TestFixture::with_seed([1; 32]);
        let record = fixture.make_record(b"value", b"key", &[(b"name", 3)], 1000);
        assert!(validate_record(&record).is_ok());
    }

    #[test]
    fn test_linked_record_carries_links() {
        let fixture = TestFixture::with_seed([2; 32]);
        let parent = fixture.make_record(b"parent", b"", &[], 1000);
        let child = fixture.make_linked_record(b"child", &[parent.hash()], 1001);
        assert_eq!(child.body.link_count(), 1);
        assert_eq!(child.body.links().next(), Some(parent.hash()));
    }
}
