//! Construction parameters for the filters.
//!
//! Every config is a plain value with builder-style construction, so benchmark drivers can
//! describe a filter without touching any global state.
//!
//! ```
//! use amq_filters::config::CuckooConfigBuilder;
//! use amq_filters::cuckoo::CuckooFilter;
//!
//! let config = CuckooConfigBuilder::default()
//!     .item_count(10_000)
//!     .fingerprint_bit_count(16)
//!     .seed(42)
//!     .build()
//!     .unwrap();
//! let filter = CuckooFilter::<u64>::from_config(&config).unwrap();
//! assert_eq!(filter.fingerprint_bit_count(), 16);
//! ```

use crate::cuckoo::{
    DEFAULT_ENTRIES_PER_INDEX, DEFAULT_FINGERPRINT_BIT_COUNT, DEFAULT_LOAD_FACTOR,
    DEFAULT_MAX_KICKS,
};
use crate::error::{FilterError, Result};
use crate::vacuum::DEFAULT_PARTITION_THRESHOLD;
use derive_builder::Builder;

/// Parameters of a `BloomFilter`.
#[derive(Clone, Debug, PartialEq, Builder)]
#[builder(pattern = "owned")]
pub struct BloomConfig {
    /// Expected number of items.
    #[builder(default = "1_000_000")]
    pub item_count: usize,

    /// Target false positive rate, strictly between 0 and 1.
    #[builder(default = "0.01")]
    pub false_positive_rate: f64,

    /// Seed for the hash functions.
    #[builder(default = "0")]
    pub seed: u64,
}

impl BloomConfig {
    /// A config for `item_count` items at `false_positive_rate`, seeded with 0.
    pub fn new(item_count: usize, false_positive_rate: f64) -> Self {
        BloomConfig {
            item_count,
            false_positive_rate,
            seed: 0,
        }
    }

    /// Checks that the item count is nonzero and the false positive rate is in `(0, 1)`.
    pub fn validate(&self) -> Result<()> {
        validate_item_count(self.item_count)?;
        if !(self.false_positive_rate > 0.0 && self.false_positive_rate < 1.0) {
            return Err(FilterError::invalid(format!(
                "false positive rate must be in (0, 1), got {}",
                self.false_positive_rate
            )));
        }
        Ok(())
    }
}

/// Parameters of a `CuckooFilter`.
#[derive(Clone, Debug, PartialEq, Builder)]
#[builder(pattern = "owned")]
pub struct CuckooConfig {
    /// Expected number of items.
    #[builder(default = "1_000_000")]
    pub item_count: usize,

    /// Width of each fingerprint, from 2 to 64 bits.
    #[builder(default = "DEFAULT_FINGERPRINT_BIT_COUNT")]
    pub fingerprint_bit_count: usize,

    /// Slots per bucket.
    #[builder(default = "DEFAULT_ENTRIES_PER_INDEX")]
    pub entries_per_index: usize,

    /// Displacements attempted before an insertion gives up with `FilterError::Full`.
    #[builder(default = "DEFAULT_MAX_KICKS")]
    pub max_kicks: usize,

    /// Fraction of slots the table is sized to fill at `item_count` items.
    #[builder(default = "DEFAULT_LOAD_FACTOR")]
    pub load_factor: f64,

    /// Seed for the hash functions and the eviction RNG.
    #[builder(default = "0")]
    pub seed: u64,
}

impl CuckooConfig {
    /// A config for `item_count` items with `fingerprint_bit_count`-bit fingerprints and
    /// default values for everything else.
    pub fn new(item_count: usize, fingerprint_bit_count: usize) -> Self {
        CuckooConfig {
            item_count,
            fingerprint_bit_count,
            entries_per_index: DEFAULT_ENTRIES_PER_INDEX,
            max_kicks: DEFAULT_MAX_KICKS,
            load_factor: DEFAULT_LOAD_FACTOR,
            seed: 0,
        }
    }

    /// Checks the item count, fingerprint width, bucket size and load factor.
    pub fn validate(&self) -> Result<()> {
        validate_bucketed(
            self.item_count,
            self.fingerprint_bit_count,
            self.entries_per_index,
            self.load_factor,
        )
    }
}

/// Parameters of a `VacuumFilter`.
#[derive(Clone, Debug, PartialEq, Builder)]
#[builder(pattern = "owned")]
pub struct VacuumConfig {
    /// Expected number of items.
    #[builder(default = "1_000_000")]
    pub item_count: usize,

    /// Width of each fingerprint, from 2 to 64 bits.
    #[builder(default = "DEFAULT_FINGERPRINT_BIT_COUNT")]
    pub fingerprint_bit_count: usize,

    /// Slots per bucket.
    #[builder(default = "DEFAULT_ENTRIES_PER_INDEX")]
    pub entries_per_index: usize,

    /// Displacements attempted before an insertion gives up with `FilterError::Full`.
    #[builder(default = "DEFAULT_MAX_KICKS")]
    pub max_kicks: usize,

    /// Fraction of slots the table is sized to fill at `item_count` items.
    #[builder(default = "DEFAULT_LOAD_FACTOR")]
    pub load_factor: f64,

    /// Filters expecting fewer items than this use a single partition spanning the whole table.
    #[builder(default = "DEFAULT_PARTITION_THRESHOLD")]
    pub partition_threshold: usize,

    /// Seed for the hash functions and the eviction RNG.
    #[builder(default = "0")]
    pub seed: u64,
}

impl VacuumConfig {
    /// A config for `item_count` items with `fingerprint_bit_count`-bit fingerprints and
    /// default values for everything else.
    pub fn new(item_count: usize, fingerprint_bit_count: usize) -> Self {
        VacuumConfig {
            item_count,
            fingerprint_bit_count,
            entries_per_index: DEFAULT_ENTRIES_PER_INDEX,
            max_kicks: DEFAULT_MAX_KICKS,
            load_factor: DEFAULT_LOAD_FACTOR,
            partition_threshold: DEFAULT_PARTITION_THRESHOLD,
            seed: 0,
        }
    }

    /// Checks the item count, fingerprint width, bucket size and load factor.
    pub fn validate(&self) -> Result<()> {
        validate_bucketed(
            self.item_count,
            self.fingerprint_bit_count,
            self.entries_per_index,
            self.load_factor,
        )
    }
}

fn validate_item_count(item_count: usize) -> Result<()> {
    if item_count == 0 {
        return Err(FilterError::invalid("item count must be greater than 0"));
    }
    Ok(())
}

fn validate_bucketed(
    item_count: usize,
    fingerprint_bit_count: usize,
    entries_per_index: usize,
    load_factor: f64,
) -> Result<()> {
    validate_item_count(item_count)?;
    if fingerprint_bit_count < 2 || fingerprint_bit_count > 64 {
        return Err(FilterError::invalid(format!(
            "fingerprint bit count must be in [2, 64], got {}",
            fingerprint_bit_count
        )));
    }
    if entries_per_index == 0 {
        return Err(FilterError::invalid("entries per index must be greater than 0"));
    }
    if !(load_factor > 0.0 && load_factor <= 1.0) {
        return Err(FilterError::invalid(format!(
            "load factor must be in (0, 1], got {}",
            load_factor
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = CuckooConfigBuilder::default().build().unwrap();
        assert_eq!(config, CuckooConfig::new(1_000_000, DEFAULT_FINGERPRINT_BIT_COUNT));

        let config = VacuumConfigBuilder::default().item_count(10).build().unwrap();
        assert_eq!(config, VacuumConfig::new(10, DEFAULT_FINGERPRINT_BIT_COUNT));

        let config = BloomConfigBuilder::default().build().unwrap();
        assert_eq!(config, BloomConfig::new(1_000_000, 0.01));
    }

    #[test]
    fn test_bloom_validate() {
        assert!(BloomConfig::new(10, 0.01).validate().is_ok());
        assert!(BloomConfig::new(0, 0.01).validate().is_err());
        assert!(BloomConfig::new(10, 0.0).validate().is_err());
        assert!(BloomConfig::new(10, 1.0).validate().is_err());
        assert!(BloomConfig::new(10, f64::NAN).validate().is_err());
    }

    #[test]
    fn test_bucketed_validate() {
        assert!(CuckooConfig::new(10, 8).validate().is_ok());
        assert!(CuckooConfig::new(10, 1).validate().is_err());
        assert!(CuckooConfig::new(10, 65).validate().is_err());
        assert!(VacuumConfig::new(0, 8).validate().is_err());

        let mut config = VacuumConfig::new(10, 8);
        config.entries_per_index = 0;
        assert!(config.validate().is_err());

        let mut config = CuckooConfig::new(10, 8);
        config.load_factor = 1.5;
        assert_eq!(
            config.validate(),
            Err(FilterError::InvalidParameters(
                "load factor must be in (0, 1], got 1.5".to_string()
            )),
        );
    }
}
