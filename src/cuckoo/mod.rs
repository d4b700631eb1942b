//! Space-efficient probabilistic data structure to test for membership in a set with the ability
//! to remove items.

mod cuckoo_filter;

pub(crate) const DEFAULT_ENTRIES_PER_INDEX: usize = 4;
pub(crate) const DEFAULT_FINGERPRINT_BIT_COUNT: usize = 8;
pub(crate) const DEFAULT_MAX_KICKS: usize = 500;
pub(crate) const DEFAULT_LOAD_FACTOR: f64 = 0.95;

pub use self::cuckoo_filter::CuckooFilter;
