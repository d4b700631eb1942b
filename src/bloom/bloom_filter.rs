use crate::bit_vec::BitVec;
use crate::config::BloomConfig;
use crate::error::{FilterError, Result};
use crate::filter::Filter;
use crate::util::{DoubleHasher, SipHasherBuilder};
use std::borrow::Borrow;
use std::f64::consts::LN_2;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;
use tracing::debug;

/// A space-efficient probabilistic data structure to test for membership in a set.
///
/// At its core, a bloom filter is a bit array, initially all set to zero. `K` hash functions
/// map each element to `K` bits in the bit array. An element definitely does not exist in the
/// bloom filter if any of the `K` bits are unset. An element is possibly in the set if all of the
/// `K` bits are set. This particular implementation of a bloom filter uses two hash functions to
/// simulate `K` hash functions.
///
/// A bloom filter cannot remove items. Any bit may be shared by several items, so clearing
/// the bits of one item could produce false negatives for others.
///
/// # Examples
///
/// ```
/// use amq_filters::bloom::BloomFilter;
///
/// let mut filter = BloomFilter::<String>::new(10, 0.01).unwrap();
///
/// assert!(!filter.contains("foo"));
/// filter.insert("foo");
/// assert!(filter.contains("foo"));
///
/// filter.clear();
/// assert!(!filter.contains("foo"));
///
/// assert_eq!(filter.len(), 96);
/// assert_eq!(filter.hasher_count(), 7);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct BloomFilter<T, B = SipHasherBuilder> {
    bit_vec: BitVec,
    hasher: DoubleHasher<T, B>,
    hasher_count: usize,
    inserted_count: usize,
    _marker: PhantomData<T>,
}

/// `m = ceil(-n ln(p) / ln(2)^2)`
fn optimal_bit_count(item_count: usize, fpp: f64) -> usize {
    (-(item_count as f64) * fpp.ln() / (LN_2 * LN_2)).ceil() as usize
}

/// `k = ceil(m / n * ln(2))`, at least 1.
fn optimal_hasher_count(bit_count: usize, item_count: usize) -> usize {
    let hasher_count = ((bit_count as f64) / (item_count as f64) * LN_2).ceil() as usize;
    hasher_count.max(1)
}

impl<T> BloomFilter<T> {
    /// Constructs a new, empty `BloomFilter` with an estimated max capacity of `item_count` items,
    /// and a maximum false positive probability of `fpp`.
    ///
    /// # Errors
    ///
    /// Returns `FilterError::InvalidParameters` if `item_count` is 0 or if `fpp` is not strictly
    /// between 0 and 1.
    ///
    /// # Examples
    ///
    /// ```
    /// use amq_filters::bloom::BloomFilter;
    ///
    /// let filter = BloomFilter::<String>::new(100_000, 0.01).unwrap();
    ///
    /// assert_eq!(filter.len(), 958_506);
    /// assert_eq!(filter.hasher_count(), 7);
    /// ```
    pub fn new(item_count: usize, fpp: f64) -> Result<Self> {
        Self::from_config(&BloomConfig::new(item_count, fpp))
    }

    /// Constructs a new, empty `BloomFilter` from `config`, with hashers derived from
    /// `config.seed`.
    pub fn from_config(config: &BloomConfig) -> Result<Self> {
        Self::with_hashers(config, SipHasherBuilder::pair_from_seed(config.seed))
    }
}

impl<T, B> BloomFilter<T, B>
where
    B: BuildHasher,
{
    /// Constructs a new, empty `BloomFilter` sized from `config`, using two hasher builders for
    /// double hashing in place of the ones `config.seed` would derive.
    ///
    /// # Examples
    ///
    /// ```
    /// use amq_filters::bloom::BloomFilter;
    /// use amq_filters::config::BloomConfig;
    /// use amq_filters::SipHasherBuilder;
    ///
    /// let filter = BloomFilter::<String>::with_hashers(
    ///     &BloomConfig::new(10, 0.01),
    ///     [SipHasherBuilder::from_seed(0, 0), SipHasherBuilder::from_seed(1, 1)],
    /// )
    /// .unwrap();
    /// ```
    pub fn with_hashers(config: &BloomConfig, hash_builders: [B; 2]) -> Result<Self> {
        config.validate()?;
        let bit_count = optimal_bit_count(config.item_count, config.false_positive_rate);
        let hasher_count = optimal_hasher_count(bit_count, config.item_count);
        Self::from_parameters_with_hashers(bit_count, hasher_count, hash_builders)
    }

    /// Constructs a new, empty `BloomFilter` with exactly `bit_count` bits and `hasher_count`
    /// probes per item.
    ///
    /// # Errors
    ///
    /// Returns `FilterError::InvalidParameters` if either count is 0.
    pub fn from_parameters_with_hashers(
        bit_count: usize,
        hasher_count: usize,
        hash_builders: [B; 2],
    ) -> Result<Self> {
        if bit_count == 0 || hasher_count == 0 {
            return Err(FilterError::invalid(format!(
                "bit count and hasher count must be greater than 0, got {} and {}",
                bit_count, hasher_count
            )));
        }
        debug!(bit_count, hasher_count, "constructed bloom filter");
        Ok(BloomFilter {
            bit_vec: BitVec::new(bit_count),
            hasher: DoubleHasher::with_hashers(hash_builders),
            hasher_count,
            inserted_count: 0,
            _marker: PhantomData,
        })
    }

    /// Inserts an element into the bloom filter. Inserting an element more than once leaves the
    /// bits unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use amq_filters::bloom::BloomFilter;
    ///
    /// let mut filter = BloomFilter::<String>::new(10, 0.01).unwrap();
    ///
    /// filter.insert("foo");
    /// ```
    pub fn insert<U>(&mut self, item: &U)
    where
        T: Borrow<U>,
        U: Hash + ?Sized,
    {
        let bit_len = self.bit_vec.len() as u64;
        let bit_vec = &mut self.bit_vec;
        self.hasher
            .hash(item)
            .take(self.hasher_count)
            .for_each(|hash| bit_vec.set((hash % bit_len) as usize, true));
        self.inserted_count += 1;
    }

    /// Checks if an element is possibly in the bloom filter.
    ///
    /// # Examples
    ///
    /// ```
    /// use amq_filters::bloom::BloomFilter;
    ///
    /// let mut filter = BloomFilter::<String>::new(10, 0.01).unwrap();
    ///
    /// assert!(!filter.contains("foo"));
    /// filter.insert("foo");
    /// assert!(filter.contains("foo"));
    /// ```
    pub fn contains<U>(&self, item: &U) -> bool
    where
        T: Borrow<U>,
        U: Hash + ?Sized,
    {
        let bit_len = self.bit_vec.len() as u64;
        self.hasher
            .hash(item)
            .take(self.hasher_count)
            .all(|hash| self.bit_vec[(hash % bit_len) as usize])
    }

    /// Returns the number of bits in the bloom filter.
    pub fn len(&self) -> usize {
        self.bit_vec.len()
    }

    /// Returns `true` if the bloom filter has no bits.
    pub fn is_empty(&self) -> bool {
        self.bit_vec.is_empty()
    }

    /// Returns the number of hash functions used by the bloom filter.
    pub fn hasher_count(&self) -> usize {
        self.hasher_count
    }

    /// Returns the number of `insert` calls made since construction or the last `clear`,
    /// duplicates included.
    pub fn inserted_count(&self) -> usize {
        self.inserted_count
    }

    /// Clears the bloom filter, removing all elements.
    pub fn clear(&mut self) {
        self.bit_vec.set_all(false);
        self.inserted_count = 0;
    }

    /// Returns the number of set bits in the bloom filter.
    pub fn count_ones(&self) -> usize {
        self.bit_vec.count_ones()
    }

    /// Returns the number of unset bits in the bloom filter.
    pub fn count_zeros(&self) -> usize {
        self.bit_vec.count_zeros()
    }

    /// Returns the estimated false positive probability of the bloom filter, measured from the
    /// fraction of set bits. This value will increase as more items are added.
    ///
    /// # Examples
    ///
    /// ```
    /// use amq_filters::bloom::BloomFilter;
    ///
    /// let mut filter = BloomFilter::<String>::new(100, 0.01).unwrap();
    /// assert!(filter.estimated_fpp() < std::f64::EPSILON);
    ///
    /// filter.insert("foo");
    /// assert!(filter.estimated_fpp() > std::f64::EPSILON);
    /// assert!(filter.estimated_fpp() < 0.01);
    /// ```
    pub fn estimated_fpp(&self) -> f64 {
        let single_fpp = self.bit_vec.count_ones() as f64 / self.bit_vec.len() as f64;
        single_fpp.powi(self.hasher_count as i32)
    }

    /// Returns the false positive probability predicted for a filter holding `item_count`
    /// distinct items: `(1 - e^(-kn/m))^k`.
    pub fn theoretical_fpp(&self, item_count: usize) -> f64 {
        let k = self.hasher_count as f64;
        let exponent = -k * item_count as f64 / self.bit_vec.len() as f64;
        (1.0 - exponent.exp()).powi(self.hasher_count as i32)
    }

    /// Returns the number of bits allocated for the bit array.
    pub fn memory_bits(&self) -> usize {
        self.bit_vec.memory_bits()
    }

    /// Returns the number of bytes allocated for the bit array.
    pub fn memory_bytes(&self) -> usize {
        (self.memory_bits() + 7) / 8
    }

    /// Returns a reference to the bloom filter's hasher builders.
    pub fn hashers(&self) -> &[B; 2] {
        self.hasher.hashers()
    }
}

impl<T, B> Filter<T> for BloomFilter<T, B>
where
    B: BuildHasher,
{
    fn insert<U>(&mut self, item: &U) -> Result<()>
    where
        T: Borrow<U>,
        U: Hash + ?Sized,
    {
        BloomFilter::insert(self, item);
        Ok(())
    }

    fn contains<U>(&self, item: &U) -> bool
    where
        T: Borrow<U>,
        U: Hash + ?Sized,
    {
        BloomFilter::contains(self, item)
    }

    fn estimated_fpp(&self) -> f64 {
        BloomFilter::estimated_fpp(self)
    }

    fn memory_bits(&self) -> usize {
        BloomFilter::memory_bits(self)
    }
}
