use crate::bucket_table::BucketTable;
use crate::config::VacuumConfig;
use crate::error::{FilterError, Result};
use crate::filter::{Filter, RemovableFilter};
use crate::util::{FingerprintHasher, SipHasherBuilder};
use crate::vacuum::AlternateRanges;
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use std::borrow::Borrow;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;
use tracing::{debug, trace};

/// A cuckoo filter variant that keeps every item's two candidate buckets inside one partition of
/// the table.
///
/// Fingerprints are split into four classes, each with its own alternate range. Most
/// fingerprints only move within a small neighbourhood of their primary bucket, which keeps the
/// table cache-friendly without requiring its length to be a power of two. Tables expecting few
/// items use a single partition of exactly `ceil(n / (entries_per_index * load_factor))` buckets.
/// See `AlternateRanges` for the addressing details.
///
/// Insertion follows the cuckoo eviction loop, but before every displacement it first tries to
/// move an occupant of the current bucket into that occupant's own alternate bucket. This raises
/// the load a table reaches before its first failed insertion. A failed insertion is rolled back
/// and reported as `FilterError::Full`.
///
/// # Examples
///
/// ```
/// use amq_filters::vacuum::VacuumFilter;
///
/// let mut filter = VacuumFilter::<String>::new(100, 8).unwrap();
///
/// assert!(!filter.contains("foo"));
/// filter.insert("foo").unwrap();
/// assert!(filter.contains("foo"));
///
/// filter.remove("foo").unwrap();
/// assert!(!filter.contains("foo"));
///
/// assert_eq!(filter.bucket_len(), 27);
/// assert_eq!(filter.capacity(), 108);
/// assert_eq!(filter.partition_count(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct VacuumFilter<T, B = SipHasherBuilder> {
    max_kicks: usize,
    ranges: AlternateRanges,
    table: BucketTable,
    hasher: FingerprintHasher<B>,
    rng: XorShiftRng,
    _marker: PhantomData<T>,
}

impl<T> VacuumFilter<T> {
    /// Constructs a new, empty `VacuumFilter` with an estimated max capacity of `item_count` and
    /// fingerprints of `fingerprint_bit_count` bits. By default, the filter will have 4 entries
    /// per index, a target load factor of 95%, a maximum of 500 displacements per insertion, and
    /// will only be partitioned when expecting at least `2^18` items.
    ///
    /// # Errors
    ///
    /// Returns `FilterError::InvalidParameters` if `item_count` is 0 or if
    /// `fingerprint_bit_count` is less than 2 or greater than 64.
    ///
    /// # Examples
    ///
    /// ```
    /// use amq_filters::vacuum::VacuumFilter;
    ///
    /// let filter = VacuumFilter::<String>::new(1_000_000, 16).unwrap();
    /// assert!(filter.partition_count() > 1);
    /// ```
    pub fn new(item_count: usize, fingerprint_bit_count: usize) -> Result<Self> {
        Self::from_config(&VacuumConfig::new(item_count, fingerprint_bit_count))
    }

    /// Constructs a new, empty `VacuumFilter` from `config`, with hashers derived from
    /// `config.seed`.
    pub fn from_config(config: &VacuumConfig) -> Result<Self> {
        Self::with_hashers(config, SipHasherBuilder::pair_from_seed(config.seed))
    }
}

impl<T, B> VacuumFilter<T, B>
where
    B: BuildHasher,
{
    /// Constructs a new, empty `VacuumFilter` sized from `config`, using two hasher builders in
    /// place of the ones `config.seed` would derive. The eviction RNG is still seeded from
    /// `config.seed`.
    pub fn with_hashers(config: &VacuumConfig, hash_builders: [B; 2]) -> Result<Self> {
        config.validate()?;
        let ranges = AlternateRanges::select(
            config.item_count,
            config.entries_per_index,
            config.load_factor,
            config.partition_threshold,
        );
        debug!(
            bucket_len = ranges.bucket_len(),
            partition_len = ranges.partition_len(),
            partition_count = ranges.partition_count(),
            ranges = ?ranges.ranges(),
            fingerprint_bit_count = config.fingerprint_bit_count,
            "constructed vacuum filter"
        );
        Ok(VacuumFilter {
            max_kicks: config.max_kicks,
            ranges,
            table: BucketTable::new(
                ranges.bucket_len(),
                config.entries_per_index,
                config.fingerprint_bit_count,
            ),
            hasher: FingerprintHasher::new(hash_builders, config.fingerprint_bit_count),
            rng: XorShiftRng::seed_from_u64(config.seed),
            _marker: PhantomData,
        })
    }

    #[inline]
    fn alternate_index(&self, index: usize, fingerprint: u64) -> usize {
        self.ranges
            .alternate(index, fingerprint, self.hasher.alternate_hash(fingerprint))
    }

    fn get_fingerprint_and_indexes<U>(&self, item: &U) -> (u64, usize, usize)
    where
        T: Borrow<U>,
        U: Hash + ?Sized,
    {
        let (fingerprint, index_1) = self.hasher.fingerprint_and_index(item, self.bucket_len());
        let index_2 = self.alternate_index(index_1, fingerprint);
        (fingerprint, index_1, index_2)
    }

    /// Inserts an element into the vacuum filter. Inserting an element twice stores two copies
    /// of its fingerprint.
    ///
    /// # Errors
    ///
    /// Returns `FilterError::Full` if the element could not be placed within `max_kicks`
    /// displacements. The filter is left unchanged in that case.
    ///
    /// # Examples
    ///
    /// ```
    /// use amq_filters::vacuum::VacuumFilter;
    ///
    /// let mut filter = VacuumFilter::<String>::new(100, 8).unwrap();
    /// filter.insert("foo").unwrap();
    /// ```
    pub fn insert<U>(&mut self, item: &U) -> Result<()>
    where
        T: Borrow<U>,
        U: Hash + ?Sized,
    {
        let (fingerprint, index_1, index_2) = self.get_fingerprint_and_indexes(item);
        if self.table.insert_fingerprint(fingerprint, index_1)
            || self.table.insert_fingerprint(fingerprint, index_2)
        {
            return Ok(());
        }

        let hasher = &self.hasher;
        let ranges = self.ranges;
        let alternate = |index: usize, fingerprint: u64| {
            ranges.alternate(index, fingerprint, hasher.alternate_hash(fingerprint))
        };
        for &index in &[index_1, index_2] {
            if let Some(entry_index) = self.table.relocate_occupant(index, &alternate) {
                self.table.set(index, entry_index, fingerprint);
                return Ok(());
            }
        }

        let index = if self.rng.gen::<bool>() {
            index_1
        } else {
            index_2
        };
        if self.table.kick_out(
            &mut self.rng,
            self.max_kicks,
            index,
            fingerprint,
            alternate,
            true,
        ) {
            return Ok(());
        }

        debug!(
            max_kicks = self.max_kicks,
            len = self.len(),
            capacity = self.capacity(),
            "vacuum eviction chain exhausted"
        );
        Err(FilterError::Full)
    }

    /// Removes one copy of an element from the vacuum filter.
    ///
    /// # Errors
    ///
    /// Returns `FilterError::NotFound` if the element's fingerprint is in neither of its buckets.
    ///
    /// # Examples
    ///
    /// ```
    /// use amq_filters::vacuum::VacuumFilter;
    ///
    /// let mut filter = VacuumFilter::<String>::new(100, 8).unwrap();
    ///
    /// filter.insert("foo").unwrap();
    /// filter.remove("foo").unwrap();
    /// assert!(filter.remove("foo").is_err());
    /// ```
    pub fn remove<U>(&mut self, item: &U) -> Result<()>
    where
        T: Borrow<U>,
        U: Hash + ?Sized,
    {
        let (fingerprint, index_1, index_2) = self.get_fingerprint_and_indexes(item);
        if self.table.remove_fingerprint(fingerprint, index_1)
            || self.table.remove_fingerprint(fingerprint, index_2)
        {
            Ok(())
        } else {
            trace!(index_1, index_2, "fingerprint not found for removal");
            Err(FilterError::NotFound)
        }
    }

    /// Checks if an element is possibly in the vacuum filter.
    pub fn contains<U>(&self, item: &U) -> bool
    where
        T: Borrow<U>,
        U: Hash + ?Sized,
    {
        let (fingerprint, index_1, index_2) = self.get_fingerprint_and_indexes(item);
        self.table.contains_fingerprint(fingerprint, index_1)
            || self.table.contains_fingerprint(fingerprint, index_2)
    }

    /// Clears the vacuum filter, removing all elements.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Returns the number of occupied entries in the vacuum filter.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if there are no occupied entries in the vacuum filter.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of entries in the vacuum filter.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns the fraction of entries that are occupied.
    pub fn load_factor(&self) -> f64 {
        self.table.load_factor()
    }

    /// Returns the number of buckets in the vacuum filter.
    pub fn bucket_len(&self) -> usize {
        self.table.bucket_len()
    }

    /// Returns the number of entries per index in the vacuum filter.
    pub fn entries_per_index(&self) -> usize {
        self.table.entries_per_index()
    }

    /// Returns the number of bits in each item fingerprint.
    pub fn fingerprint_bit_count(&self) -> usize {
        self.hasher.fingerprint_bit_count()
    }

    /// Returns the maximum number of displacements attempted by a single insertion.
    pub fn max_kicks(&self) -> usize {
        self.max_kicks
    }

    /// Returns the number of partitions in the table.
    pub fn partition_count(&self) -> usize {
        self.ranges.partition_count()
    }

    /// Returns the number of buckets in each partition.
    pub fn partition_len(&self) -> usize {
        self.ranges.partition_len()
    }

    /// Returns the bucket addressing of the vacuum filter.
    pub fn alternate_ranges(&self) -> &AlternateRanges {
        &self.ranges
    }

    /// Returns the estimated false positive probability of the vacuum filter. This value will
    /// increase as more items are added.
    pub fn estimated_fpp(&self) -> f64 {
        self.table.estimated_fpp()
    }

    /// Returns the number of bits allocated for the fingerprint table.
    pub fn memory_bits(&self) -> usize {
        self.table.memory_bits()
    }

    /// Returns the number of bytes allocated for the fingerprint table.
    pub fn memory_bytes(&self) -> usize {
        self.table.memory_bytes()
    }

    /// Returns a reference to the vacuum filter's hasher builders.
    pub fn hashers(&self) -> &[B; 2] {
        self.hasher.hashers()
    }
}

impl<T, B> Filter<T> for VacuumFilter<T, B>
where
    B: BuildHasher,
{
    fn insert<U>(&mut self, item: &U) -> Result<()>
    where
        T: Borrow<U>,
        U: Hash + ?Sized,
    {
        VacuumFilter::insert(self, item)
    }

    fn contains<U>(&self, item: &U) -> bool
    where
        T: Borrow<U>,
        U: Hash + ?Sized,
    {
        VacuumFilter::contains(self, item)
    }

    fn estimated_fpp(&self) -> f64 {
        VacuumFilter::estimated_fpp(self)
    }

    fn memory_bits(&self) -> usize {
        VacuumFilter::memory_bits(self)
    }
}

impl<T, B> RemovableFilter<T> for VacuumFilter<T, B>
where
    B: BuildHasher,
{
    fn remove<U>(&mut self, item: &U) -> Result<()>
    where
        T: Borrow<U>,
        U: Hash + ?Sized,
    {
        VacuumFilter::remove(self, item)
    }
}

#[cfg(test)]
mod tests {
    use super::VacuumFilter;
    use crate::config::VacuumConfig;
    use crate::error::FilterError;
    use crate::util::tests::{hash_builder_1, hash_builder_2};

    fn filter_with(config: VacuumConfig) -> VacuumFilter<String> {
        VacuumFilter::with_hashers(&config, [hash_builder_1(), hash_builder_2()]).unwrap()
    }

    #[test]
    fn test_new() {
        let filter = filter_with(VacuumConfig::new(100, 8));
        assert!(filter.is_empty());
        assert_eq!(filter.bucket_len(), 27);
        assert_eq!(filter.capacity(), 108);
        assert_eq!(filter.partition_count(), 1);
        assert_eq!(filter.partition_len(), 27);
        assert_eq!(filter.alternate_ranges().ranges(), None);
        assert_eq!(filter.max_kicks(), 500);
        assert_eq!(filter.memory_bits(), 14 * 64);
    }

    #[test]
    fn test_partitioned() {
        let mut filter = filter_with(VacuumConfig::new(300_000, 12));

        assert_eq!(filter.partition_len(), 4096);
        assert_eq!(filter.partition_count(), 20);
        assert_eq!(filter.bucket_len(), 20 * 4096);

        let items = (0..250_000).map(|item| item.to_string()).collect::<Vec<_>>();
        for item in &items {
            filter.insert(item).unwrap();
        }
        assert_eq!(filter.len(), items.len());
        assert!(items.iter().all(|item| filter.contains(item)));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            VacuumFilter::<String>::new(0, 8),
            Err(FilterError::InvalidParameters(_))
        ));
        assert!(matches!(
            VacuumFilter::<String>::new(100, 65),
            Err(FilterError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_insert_and_remove() {
        let mut filter = filter_with(VacuumConfig::new(100, 8));
        filter.insert("foo").unwrap();
        filter.insert("foo").unwrap();
        assert_eq!(filter.len(), 2);

        filter.remove("foo").unwrap();
        assert!(filter.contains("foo"));
        filter.remove("foo").unwrap();
        assert!(!filter.contains("foo"));
        assert_eq!(filter.remove("foo"), Err(FilterError::NotFound));
        assert!(filter.is_empty());
    }

    fn fill_candidates(filter: &mut VacuumFilter<String>, indexes: [usize; 2], occupant: u64) {
        for &index in &indexes {
            for entry_index in 0..filter.entries_per_index() {
                filter.table.set(index, entry_index, occupant);
            }
        }
    }

    #[test]
    fn test_insert_relocates_occupant_before_kicking() {
        let mut config = VacuumConfig::new(1_000, 16);
        config.max_kicks = 0;
        let mut filter = filter_with(config);
        let (fingerprint, index_1, index_2) = filter.get_fingerprint_and_indexes("foo");

        let occupant = (1..)
            .find(|occupant| {
                let alternate = filter.alternate_index(index_1, *occupant);
                *occupant != fingerprint && alternate != index_1 && alternate != index_2
            })
            .unwrap();
        fill_candidates(&mut filter, [index_1, index_2], occupant);

        filter.insert("foo").unwrap();
        assert!(filter.contains("foo"));
        let alternate = filter.alternate_index(index_1, occupant);
        assert!(filter.table.contains_fingerprint(occupant, alternate));
    }

    #[test]
    fn test_insert_without_kicks_or_movable_occupant_is_full() {
        let mut config = VacuumConfig::new(1_000, 16);
        config.max_kicks = 0;
        let mut filter = filter_with(config);
        let (fingerprint, index_1, index_2) = filter.get_fingerprint_and_indexes("foo");

        // every occupant can only move between the two full candidate buckets
        let occupant = (1..)
            .find(|occupant| {
                let stays = |index| {
                    let alternate = filter.alternate_index(index, *occupant);
                    alternate == index_1 || alternate == index_2
                };
                *occupant != fingerprint && stays(index_1) && stays(index_2)
            })
            .unwrap();
        fill_candidates(&mut filter, [index_1, index_2], occupant);
        let before = filter.table.clone();

        assert_eq!(filter.insert("foo"), Err(FilterError::Full));
        assert_eq!(filter.table, before);
    }

    #[test]
    fn test_full_is_rolled_back() {
        let mut config = VacuumConfig::new(4, 8);
        config.entries_per_index = 1;
        config.load_factor = 1.0;
        let mut filter = filter_with(config);
        assert_eq!(filter.capacity(), 4);

        let mut inserted = Vec::new();
        let mut full_count = 0;
        for item in 0..32 {
            let item = item.to_string();
            let before = filter.table.clone();
            match filter.insert(&item) {
                Ok(()) => inserted.push(item),
                Err(FilterError::Full) => {
                    full_count += 1;
                    assert_eq!(filter.table, before);
                }
                Err(err) => panic!("unexpected error: {}", err),
            }
        }

        assert!(full_count >= 28);
        assert_eq!(filter.len(), inserted.len());
        assert!(inserted.iter().all(|item| filter.contains(item)));
    }

    #[test]
    fn test_clear() {
        let mut filter = filter_with(VacuumConfig::new(100, 8));
        filter.insert("foobar").unwrap();
        filter.clear();
        assert!(filter.is_empty());
        assert!(!filter.contains("foobar"));
    }

    #[test]
    fn test_estimated_fpp() {
        let mut filter = filter_with(VacuumConfig::new(100, 11));
        assert!(filter.estimated_fpp() < std::f64::EPSILON);

        filter.insert("foo").unwrap();

        let expected_fpp = 1.0 - ((2f64.powi(11) - 2.0) / (2f64.powi(11) - 1.0)).powf(8.0 / 108.0);
        assert!((filter.estimated_fpp() - expected_fpp).abs() < std::f64::EPSILON);
    }
}
