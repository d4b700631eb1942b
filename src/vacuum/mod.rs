//! Cuckoo-style filter whose alternate buckets stay within a partition of the table.

mod alternate_range;
mod vacuum_filter;

pub(crate) const DEFAULT_PARTITION_THRESHOLD: usize = 1 << 18;

pub use self::alternate_range::{AlternateRanges, MIN_PARTITION_COUNT, RANGE_CLASS_COUNT};
pub use self::vacuum_filter::VacuumFilter;
