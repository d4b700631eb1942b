use crate::bucket_table::BucketTable;
use crate::config::CuckooConfig;
use crate::error::{FilterError, Result};
use crate::filter::{Filter, RemovableFilter};
use crate::util::{FingerprintHasher, SipHasherBuilder};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use std::borrow::Borrow;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;
use tracing::{debug, trace};

/// A space-efficient probabilistic data structure to test for membership in a set. Cuckoo filters
/// also provide the flexibility to remove items.
///
/// A cuckoo filter is based on cuckoo hashing and is essentially a cuckoo hash table storing
/// each keys' fingerprint. An item's primary bucket comes from its hash. Its alternate bucket is
/// the primary bucket XOR a hash of its fingerprint. The alternate can therefore be recomputed
/// from the fingerprint alone when the fingerprint is displaced. The number of buckets is
/// rounded up to a power of two so the XOR stays inside the table.
///
/// When both candidate buckets are full, an insertion evicts a random occupant and moves it to
/// its own alternate bucket, for at most `max_kicks` displacements. If no slot frees up, the
/// displacements are undone and `FilterError::Full` is returned. The filter then has to be
/// rebuilt with a larger capacity.
///
/// Each lookup checks `2 * entries_per_index` slots, so a full filter with `f`-bit fingerprints
/// has a false positive rate of about `2 * entries_per_index / 2^f`. Removing an item that was
/// never inserted may remove a colliding fingerprint that belongs to another item.
///
/// # Examples
///
/// ```
/// use amq_filters::cuckoo::CuckooFilter;
///
/// let mut filter = CuckooFilter::<String>::new(100, 8).unwrap();
///
/// assert!(!filter.contains("foo"));
/// filter.insert("foo").unwrap();
/// assert!(filter.contains("foo"));
///
/// filter.remove("foo").unwrap();
/// assert!(!filter.contains("foo"));
///
/// assert_eq!(filter.len(), 0);
/// assert_eq!(filter.capacity(), 128);
/// assert_eq!(filter.bucket_len(), 32);
/// assert_eq!(filter.fingerprint_bit_count(), 8);
/// ```
#[derive(Clone, Debug)]
pub struct CuckooFilter<T, B = SipHasherBuilder> {
    max_kicks: usize,
    table: BucketTable,
    hasher: FingerprintHasher<B>,
    rng: XorShiftRng,
    _marker: PhantomData<T>,
}

impl<T> CuckooFilter<T> {
    /// Constructs a new, empty `CuckooFilter` with an estimated max capacity of `item_count` and
    /// fingerprints of `fingerprint_bit_count` bits. By default, the cuckoo filter will have 4
    /// entries per index, a target load factor of 95%, and a maximum of 500 item displacements
    /// before terminating the insertion process.
    ///
    /// The number of buckets will be rounded up to the next power of two.
    ///
    /// # Errors
    ///
    /// Returns `FilterError::InvalidParameters` if `item_count` is 0 or if
    /// `fingerprint_bit_count` is less than 2 or greater than 64.
    ///
    /// # Examples
    ///
    /// ```
    /// use amq_filters::cuckoo::CuckooFilter;
    ///
    /// let filter = CuckooFilter::<String>::new(100, 12).unwrap();
    /// ```
    pub fn new(item_count: usize, fingerprint_bit_count: usize) -> Result<Self> {
        Self::from_config(&CuckooConfig::new(item_count, fingerprint_bit_count))
    }

    /// Constructs a new, empty `CuckooFilter` from `config`, with hashers derived from
    /// `config.seed`.
    pub fn from_config(config: &CuckooConfig) -> Result<Self> {
        Self::with_hashers(config, SipHasherBuilder::pair_from_seed(config.seed))
    }
}

#[inline]
fn xor_alternate<B>(
    hasher: &FingerprintHasher<B>,
    bucket_len: usize,
    index: usize,
    fingerprint: u64,
) -> usize
where
    B: BuildHasher,
{
    (index ^ hasher.alternate_hash(fingerprint) as usize) & (bucket_len - 1)
}

impl<T, B> CuckooFilter<T, B>
where
    B: BuildHasher,
{
    /// Constructs a new, empty `CuckooFilter` sized from `config`, using two hasher builders in
    /// place of the ones `config.seed` would derive. The eviction RNG is still seeded from
    /// `config.seed`.
    ///
    /// # Examples
    ///
    /// ```
    /// use amq_filters::config::CuckooConfig;
    /// use amq_filters::cuckoo::CuckooFilter;
    /// use amq_filters::SipHasherBuilder;
    ///
    /// let filter = CuckooFilter::<String>::with_hashers(
    ///     &CuckooConfig::new(100, 16),
    ///     [SipHasherBuilder::from_seed(0, 0), SipHasherBuilder::from_seed(1, 1)],
    /// )
    /// .unwrap();
    /// ```
    pub fn with_hashers(config: &CuckooConfig, hash_builders: [B; 2]) -> Result<Self> {
        config.validate()?;
        let exact_bucket_len = (config.item_count as f64
            / (config.entries_per_index as f64 * config.load_factor))
            .ceil() as usize;
        let bucket_len = exact_bucket_len.max(1).next_power_of_two();
        debug!(
            bucket_len,
            entries_per_index = config.entries_per_index,
            fingerprint_bit_count = config.fingerprint_bit_count,
            max_kicks = config.max_kicks,
            "constructed cuckoo filter"
        );
        Ok(CuckooFilter {
            max_kicks: config.max_kicks,
            table: BucketTable::new(
                bucket_len,
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
        xor_alternate(&self.hasher, self.bucket_len(), index, fingerprint)
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

    /// Inserts an element into the cuckoo filter. Inserting an element twice stores two copies
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
    /// use amq_filters::cuckoo::CuckooFilter;
    ///
    /// let mut filter = CuckooFilter::<String>::new(100, 8).unwrap();
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

        // have to kick out an entry
        let index = if self.rng.gen::<bool>() {
            index_1
        } else {
            index_2
        };
        let hasher = &self.hasher;
        let bucket_len = self.table.bucket_len();
        let alternate =
            |index: usize, fingerprint: u64| xor_alternate(hasher, bucket_len, index, fingerprint);
        if self.table.kick_out(
            &mut self.rng,
            self.max_kicks,
            index,
            fingerprint,
            alternate,
            false,
        ) {
            return Ok(());
        }

        debug!(
            max_kicks = self.max_kicks,
            len = self.len(),
            capacity = self.capacity(),
            "cuckoo eviction chain exhausted"
        );
        Err(FilterError::Full)
    }

    /// Removes one copy of an element from the cuckoo filter.
    ///
    /// # Errors
    ///
    /// Returns `FilterError::NotFound` if the element's fingerprint is in neither of its buckets.
    ///
    /// # Examples
    ///
    /// ```
    /// use amq_filters::cuckoo::CuckooFilter;
    ///
    /// let mut filter = CuckooFilter::<String>::new(100, 8).unwrap();
    ///
    /// filter.insert("foo").unwrap();
    /// assert!(filter.contains("foo"));
    ///
    /// filter.remove("foo").unwrap();
    /// assert!(!filter.contains("foo"));
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

    /// Checks if an element is possibly in the cuckoo filter.
    ///
    /// # Examples
    ///
    /// ```
    /// use amq_filters::cuckoo::CuckooFilter;
    ///
    /// let mut filter = CuckooFilter::<String>::new(100, 8).unwrap();
    ///
    /// filter.insert("foo").unwrap();
    /// assert!(filter.contains("foo"));
    /// ```
    pub fn contains<U>(&self, item: &U) -> bool
    where
        T: Borrow<U>,
        U: Hash + ?Sized,
    {
        let (fingerprint, index_1, index_2) = self.get_fingerprint_and_indexes(item);
        self.table.contains_fingerprint(fingerprint, index_1)
            || self.table.contains_fingerprint(fingerprint, index_2)
    }

    /// Clears the cuckoo filter, removing all elements.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Returns the number of occupied entries in the cuckoo filter.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if there are no occupied entries in the cuckoo filter.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of entries in the cuckoo filter.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns the fraction of entries that are occupied.
    pub fn load_factor(&self) -> f64 {
        self.table.load_factor()
    }

    /// Returns the number of buckets in the cuckoo filter.
    pub fn bucket_len(&self) -> usize {
        self.table.bucket_len()
    }

    /// Returns the number of entries per index in the cuckoo filter.
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

    /// Returns the estimated false positive probability of the cuckoo filter. This value will
    /// increase as more items are added.
    ///
    /// # Examples
    ///
    /// ```
    /// use amq_filters::cuckoo::CuckooFilter;
    ///
    /// let mut filter = CuckooFilter::<String>::new(100, 8).unwrap();
    /// assert!(filter.estimated_fpp() < std::f64::EPSILON);
    ///
    /// filter.insert("foo").unwrap();
    /// assert!(filter.estimated_fpp() > std::f64::EPSILON);
    /// assert!(filter.estimated_fpp() < 0.01);
    /// ```
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

    /// Returns a reference to the cuckoo filter's hasher builders.
    pub fn hashers(&self) -> &[B; 2] {
        self.hasher.hashers()
    }
}

impl<T, B> Filter<T> for CuckooFilter<T, B>
where
    B: BuildHasher,
{
    fn insert<U>(&mut self, item: &U) -> Result<()>
    where
        T: Borrow<U>,
        U: Hash + ?Sized,
    {
        CuckooFilter::insert(self, item)
    }

    fn contains<U>(&self, item: &U) -> bool
    where
        T: Borrow<U>,
        U: Hash + ?Sized,
    {
        CuckooFilter::contains(self, item)
    }

    fn estimated_fpp(&self) -> f64 {
        CuckooFilter::estimated_fpp(self)
    }

    fn memory_bits(&self) -> usize {
        CuckooFilter::memory_bits(self)
    }
}

impl<T, B> RemovableFilter<T> for CuckooFilter<T, B>
where
    B: BuildHasher,
{
    fn remove<U>(&mut self, item: &U) -> Result<()>
    where
        T: Borrow<U>,
        U: Hash + ?Sized,
    {
        CuckooFilter::remove(self, item)
    }
}
