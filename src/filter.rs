//! The membership contract shared by every filter.

use crate::error::Result;
use std::borrow::Borrow;
use std::hash::Hash;

/// An approximate membership query structure: no false negatives, bounded false positives.
///
/// The trait lets benchmark drivers and property tests treat all filters alike. Each filter
/// also exposes the same operations as inherent methods.
///
/// # Examples
///
/// ```
/// use amq_filters::bloom::BloomFilter;
/// use amq_filters::cuckoo::CuckooFilter;
/// use amq_filters::Filter;
///
/// fn load<F: Filter<u64>>(filter: &mut F, items: &[u64]) -> usize {
///     items.iter().filter(|item| filter.insert(*item).is_ok()).count()
/// }
///
/// let items = (0..100).collect::<Vec<u64>>();
/// let mut bloom = BloomFilter::<u64>::new(100, 0.01).unwrap();
/// let mut cuckoo = CuckooFilter::<u64>::new(100, 12).unwrap();
///
/// assert_eq!(load(&mut bloom, &items), 100);
/// assert_eq!(load(&mut cuckoo, &items), 100);
/// assert!(Filter::contains(&cuckoo, &42u64));
/// ```
pub trait Filter<T> {
    /// Adds an item. Bloom filters never fail; bucketed filters return `FilterError::Full`
    /// when the item cannot be placed.
    fn insert<U>(&mut self, item: &U) -> Result<()>
    where
        T: Borrow<U>,
        U: Hash + ?Sized;

    /// Returns `false` if the item is definitely absent and `true` if it may be present.
    fn contains<U>(&self, item: &U) -> bool
    where
        T: Borrow<U>,
        U: Hash + ?Sized;

    /// Estimated probability that `contains` answers `true` for an item that was never added.
    fn estimated_fpp(&self) -> f64;

    /// Bits allocated for the filter's storage.
    fn memory_bits(&self) -> usize;

    /// Bytes allocated for the filter's storage.
    fn memory_bytes(&self) -> usize {
        (self.memory_bits() + 7) / 8
    }
}

/// A filter that can also forget items.
///
/// Only fingerprints are stored, so removing an item that was never inserted can remove the
/// fingerprint of a different item that collided with it. Callers should only remove items
/// they know were inserted.
pub trait RemovableFilter<T>: Filter<T> {
    /// Removes one occurrence of an item, or returns `FilterError::NotFound`.
    fn remove<U>(&mut self, item: &U) -> Result<()>
    where
        T: Borrow<U>,
        U: Hash + ?Sized;
}
