use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use siphasher::sip::SipHasher;
use std::borrow::Borrow;
use std::hash::BuildHasher;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::{cmp, fmt};

/// The default hash builder for all filters.
#[derive(Clone, Copy)]
pub struct SipHasherBuilder {
    k0: u64,
    k1: u64,
    hasher: SipHasher,
}

impl SipHasherBuilder {
    /// Constructs a new `SipHasherBuilder` that is seeded with the given keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use amq_filters::SipHasherBuilder;
    ///
    /// let hash_builder = SipHasherBuilder::from_seed(0, 0);
    /// ```
    pub fn from_seed(k0: u64, k1: u64) -> Self {
        SipHasherBuilder {
            k0,
            k1,
            hasher: SipHasher::new_with_keys(k0, k1),
        }
    }

    /// Derives the two hasher builders used by every filter from a single seed. The same seed
    /// always yields the same pair.
    ///
    /// # Examples
    ///
    /// ```
    /// use amq_filters::SipHasherBuilder;
    ///
    /// let hash_builders = SipHasherBuilder::pair_from_seed(42);
    /// assert_eq!(hash_builders, SipHasherBuilder::pair_from_seed(42));
    /// assert_ne!(hash_builders[0], hash_builders[1]);
    /// ```
    pub fn pair_from_seed(seed: u64) -> [Self; 2] {
        let mut rng = XorShiftRng::seed_from_u64(seed);
        [
            Self::from_seed(rng.gen(), rng.gen()),
            Self::from_seed(rng.gen(), rng.gen()),
        ]
    }
}

impl fmt::Debug for SipHasherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SipHasherBuilder")
            .field("k0", &self.k0)
            .field("k1", &self.k1)
            .finish()
    }
}

impl cmp::PartialEq for SipHasherBuilder {
    fn eq(&self, other: &SipHasherBuilder) -> bool {
        self.k0 == other.k0 && self.k1 == other.k1
    }
}

impl BuildHasher for SipHasherBuilder {
    type Hasher = SipHasher;

    #[inline]
    fn build_hasher(&self) -> SipHasher {
        self.hasher
    }
}

/// Simulates `k` independent hash functions from two seeded ones.
#[derive(Debug, PartialEq)]
pub(crate) struct DoubleHasher<T, B = SipHasherBuilder> {
    hash_builders: [B; 2],
    _marker: PhantomData<T>,
}

impl<T, B: Clone> Clone for DoubleHasher<T, B> {
    fn clone(&self) -> Self {
        DoubleHasher {
            hash_builders: self.hash_builders.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T, B> DoubleHasher<T, B>
where
    B: BuildHasher,
{
    pub fn with_hashers(hash_builders: [B; 2]) -> Self {
        DoubleHasher {
            hash_builders,
            _marker: PhantomData,
        }
    }

    pub fn hash<U>(&self, item: &U) -> HashIter
    where
        T: Borrow<U>,
        U: Hash + ?Sized,
    {
        HashIter {
            a: hash(&self.hash_builders[0], item),
            b: hash(&self.hash_builders[1], item),
            c: 0,
        }
    }

    pub fn hashers(&self) -> &[B; 2] {
        &self.hash_builders
    }
}

/// Hashes `item` with a fresh hasher from `hash_builder`.
pub fn hash<U>(hash_builder: &impl BuildHasher, item: &U) -> u64
where
    U: Hash + ?Sized,
{
    let mut hasher = hash_builder.build_hasher();
    item.hash(&mut hasher);
    hasher.finish()
}

/// Enhanced double hashing over `a` and `b`, computed incrementally without multiplications.
#[derive(Clone, Copy)]
pub(crate) struct HashIter {
    a: u64,
    b: u64,
    c: u64,
}

impl Iterator for HashIter {
    type Item = u64;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let ret = self.a;
        self.a = self.a.wrapping_add(self.b);
        self.b = self.b.wrapping_add(self.c);
        self.c += 1;
        Some(ret)
    }
}

/// Derives fingerprints and primary bucket indexes for the bucketed filters.
///
/// The fingerprint comes from the first hasher and the primary index from the second, so the
/// two behave as independent random variables. The alternate bucket offset is a hash of the
/// fingerprint alone, which lets a filter relocate a fingerprint without knowing its key.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct FingerprintHasher<B = SipHasherBuilder> {
    hash_builders: [B; 2],
    fingerprint_bit_count: usize,
}

pub(crate) fn fingerprint_mask(fingerprint_bit_count: usize) -> u64 {
    if fingerprint_bit_count >= 64 {
        !0
    } else {
        (1u64 << fingerprint_bit_count) - 1
    }
}

impl<B> FingerprintHasher<B>
where
    B: BuildHasher,
{
    pub fn new(hash_builders: [B; 2], fingerprint_bit_count: usize) -> Self {
        FingerprintHasher {
            hash_builders,
            fingerprint_bit_count,
        }
    }

    /// Returns a nonzero `fingerprint_bit_count`-bit fingerprint of `item` and its primary
    /// bucket in `[0, bucket_len)`.
    pub fn fingerprint_and_index<U>(&self, item: &U, bucket_len: usize) -> (u64, usize)
    where
        U: Hash + ?Sized,
    {
        let mask = fingerprint_mask(self.fingerprint_bit_count);
        let mut h0 = hash(&self.hash_builders[0], item);
        let mut fingerprint = h0 & mask;

        // 0 marks an empty slot, rehash until the fingerprint avoids it
        while fingerprint == 0 {
            h0 = hash(&self.hash_builders[0], &h0);
            fingerprint = h0 & mask;
        }

        let h1 = hash(&self.hash_builders[1], item);
        (fingerprint, (h1 % bucket_len as u64) as usize)
    }

    pub fn alternate_hash(&self, fingerprint: u64) -> u64 {
        hash(&self.hash_builders[1], &fingerprint)
    }

    pub fn fingerprint_bit_count(&self) -> usize {
        self.fingerprint_bit_count
    }

    pub fn hashers(&self) -> &[B; 2] {
        &self.hash_builders
    }
}

#[cfg(test)]
pub mod tests {
    use super::{fingerprint_mask, hash, DoubleHasher, FingerprintHasher, SipHasherBuilder};
    use proptest::prelude::*;
    use siphasher::sip::SipHasher;

    pub fn hash_builder_1() -> SipHasherBuilder {
        SipHasherBuilder {
            k0: 0,
            k1: 0,
            hasher: SipHasher::new_with_keys(0, 0),
        }
    }

    pub fn hash_builder_2() -> SipHasherBuilder {
        SipHasherBuilder {
            k0: 1,
            k1: 1,
            hasher: SipHasher::new_with_keys(1, 1),
        }
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash(&hash_builder_1(), "foo"), hash(&hash_builder_1(), "foo"));
        assert_ne!(hash(&hash_builder_1(), "foo"), hash(&hash_builder_2(), "foo"));
    }

    #[test]
    fn test_pair_from_seed() {
        assert_eq!(
            SipHasherBuilder::pair_from_seed(7),
            SipHasherBuilder::pair_from_seed(7),
        );
        assert_ne!(
            SipHasherBuilder::pair_from_seed(7),
            SipHasherBuilder::pair_from_seed(8),
        );
    }

    #[test]
    fn test_double_hasher() {
        let hasher = DoubleHasher::<String>::with_hashers([hash_builder_1(), hash_builder_2()]);
        let a = hash(&hash_builder_1(), "foo");
        let b = hash(&hash_builder_2(), "foo");
        let hashes = hasher.hash("foo").take(4).collect::<Vec<u64>>();
        assert_eq!(
            hashes,
            vec![
                a,
                a.wrapping_add(b),
                a.wrapping_add(b.wrapping_mul(2)),
                a.wrapping_add(b.wrapping_mul(3)).wrapping_add(1),
            ],
        );
    }

    #[test]
    fn test_fingerprint_mask() {
        assert_eq!(fingerprint_mask(8), 0xFF);
        assert_eq!(fingerprint_mask(16), 0xFFFF);
        assert_eq!(fingerprint_mask(64), !0);
    }

    proptest! {
        #[test]
        fn fingerprint_is_nonzero_and_in_range(
            item in any::<u64>(),
            bit_count in 2usize..=32,
            bucket_len in 1usize..10_000,
        ) {
            let hasher = FingerprintHasher::new([hash_builder_1(), hash_builder_2()], bit_count);
            let (fingerprint, index) = hasher.fingerprint_and_index(&item, bucket_len);
            prop_assert!(fingerprint != 0);
            prop_assert!(fingerprint <= fingerprint_mask(bit_count));
            prop_assert!(index < bucket_len);
            prop_assert_eq!(hasher.fingerprint_and_index(&item, bucket_len), (fingerprint, index));
        }
    }
}
