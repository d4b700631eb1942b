use crate::bit_array_vec::BitArrayVec;
use rand::Rng;

/// Buckets of `entries_per_index` fingerprint slots, packed into a single `BitArrayVec`. A zero
/// slot is empty.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct BucketTable {
    entries_per_index: usize,
    fingerprint_vec: BitArrayVec,
}

impl BucketTable {
    pub fn new(bucket_len: usize, entries_per_index: usize, fingerprint_bit_count: usize) -> Self {
        BucketTable {
            entries_per_index,
            fingerprint_vec: BitArrayVec::new(
                fingerprint_bit_count,
                bucket_len * entries_per_index,
            ),
        }
    }

    #[inline]
    fn get_vec_index(&self, index: usize, entry_index: usize) -> usize {
        index * self.entries_per_index + entry_index
    }

    /// Places `fingerprint` in the first empty slot of bucket `index`.
    pub fn insert_fingerprint(&mut self, fingerprint: u64, index: usize) -> bool {
        for entry_index in 0..self.entries_per_index {
            let vec_index = self.get_vec_index(index, entry_index);
            if self.fingerprint_vec.get(vec_index) == 0 {
                self.fingerprint_vec.set(vec_index, fingerprint);
                return true;
            }
        }
        false
    }

    pub fn contains_fingerprint(&self, fingerprint: u64, index: usize) -> bool {
        (0..self.entries_per_index).any(|entry_index| {
            self.fingerprint_vec
                .get(self.get_vec_index(index, entry_index))
                == fingerprint
        })
    }

    /// Clears exactly one slot of bucket `index` holding `fingerprint`.
    pub fn remove_fingerprint(&mut self, fingerprint: u64, index: usize) -> bool {
        for entry_index in 0..self.entries_per_index {
            let vec_index = self.get_vec_index(index, entry_index);
            if self.fingerprint_vec.get(vec_index) == fingerprint {
                self.fingerprint_vec.set(vec_index, 0);
                return true;
            }
        }
        false
    }

    pub fn get(&self, index: usize, entry_index: usize) -> u64 {
        self.fingerprint_vec.get(self.get_vec_index(index, entry_index))
    }

    pub fn set(&mut self, index: usize, entry_index: usize, fingerprint: u64) {
        let vec_index = self.get_vec_index(index, entry_index);
        self.fingerprint_vec.set(vec_index, fingerprint);
    }

    /// Writes `fingerprint` into a slot and returns the fingerprint it displaced.
    pub fn swap(&mut self, index: usize, entry_index: usize, fingerprint: u64) -> u64 {
        let vec_index = self.get_vec_index(index, entry_index);
        let evicted = self.fingerprint_vec.get(vec_index);
        self.fingerprint_vec.set(vec_index, fingerprint);
        evicted
    }

    /// Undoes the swaps of an eviction chain, latest first. `homeless` is the fingerprint the
    /// chain was left holding. Returns the fingerprint that started the chain.
    pub fn rollback(&mut self, path: &[(usize, usize)], homeless: u64) -> u64 {
        path.iter()
            .rev()
            .fold(homeless, |fingerprint, &(index, entry_index)| {
                self.swap(index, entry_index, fingerprint)
            })
    }

    /// Moves one occupant of bucket `index` to its alternate bucket and returns the freed entry.
    pub fn relocate_occupant<A>(&mut self, index: usize, alternate: A) -> Option<usize>
    where
        A: Fn(usize, u64) -> usize,
    {
        for entry_index in 0..self.entries_per_index {
            let fingerprint = self.get(index, entry_index);
            if fingerprint == 0 {
                continue;
            }
            let alternate_index = alternate(index, fingerprint);
            if alternate_index != index && self.insert_fingerprint(fingerprint, alternate_index) {
                self.set(index, entry_index, 0);
                return Some(entry_index);
            }
        }
        None
    }

    /// Places `fingerprint` by displacing random occupants, starting at the full bucket `index`,
    /// for at most `max_kicks` displacements. With `lookahead`, every bucket the chain reaches
    /// first tries `relocate_occupant`. Returns `false` after undoing the whole chain if no slot
    /// frees up.
    pub fn kick_out<R, A>(
        &mut self,
        rng: &mut R,
        max_kicks: usize,
        index: usize,
        fingerprint: u64,
        alternate: A,
        lookahead: bool,
    ) -> bool
    where
        R: Rng,
        A: Fn(usize, u64) -> usize,
    {
        let mut index = index;
        let mut fingerprint = fingerprint;
        let mut path = Vec::new();

        for _ in 0..max_kicks {
            let entry_index = rng.gen_range(0, self.entries_per_index);
            fingerprint = self.swap(index, entry_index, fingerprint);
            path.push((index, entry_index));

            index = alternate(index, fingerprint);
            if self.insert_fingerprint(fingerprint, index) {
                return true;
            }
            if lookahead {
                if let Some(entry_index) = self.relocate_occupant(index, &alternate) {
                    self.set(index, entry_index, fingerprint);
                    return true;
                }
            }
        }

        self.rollback(&path, fingerprint);
        false
    }

    pub fn clear(&mut self) {
        self.fingerprint_vec.clear();
    }

    pub fn len(&self) -> usize {
        self.fingerprint_vec.occupied_len()
    }

    pub fn capacity(&self) -> usize {
        self.fingerprint_vec.len()
    }

    pub fn load_factor(&self) -> f64 {
        self.len() as f64 / self.capacity() as f64
    }

    pub fn bucket_len(&self) -> usize {
        self.fingerprint_vec.len() / self.entries_per_index
    }

    pub fn entries_per_index(&self) -> usize {
        self.entries_per_index
    }

    pub fn fingerprint_bit_count(&self) -> usize {
        self.fingerprint_vec.bit_count()
    }

    /// `1 - ((2^f - 2) / (2^f - 1))^(2 * entries_per_index * load_factor)`
    pub fn estimated_fpp(&self) -> f64 {
        let fingerprints_count = 2.0f64.powi(self.fingerprint_bit_count() as i32);
        let single_fpp = (fingerprints_count - 2.0) / (fingerprints_count - 1.0);
        1.0 - single_fpp.powf(2.0 * self.entries_per_index as f64 * self.load_factor())
    }

    pub fn memory_bits(&self) -> usize {
        self.fingerprint_vec.memory_bits()
    }

    pub fn memory_bytes(&self) -> usize {
        (self.memory_bits() + 7) / 8
    }
}

#[cfg(test)]
mod tests {
    use super::BucketTable;
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    #[test]
    fn test_new() {
        let table = BucketTable::new(32, 4, 12);
        assert_eq!(table.bucket_len(), 32);
        assert_eq!(table.entries_per_index(), 4);
        assert_eq!(table.capacity(), 128);
        assert_eq!(table.fingerprint_bit_count(), 12);
        assert_eq!(table.memory_bits(), 128 * 12);
        assert_eq!(table.memory_bytes(), 192);
        assert!(table.estimated_fpp() < std::f64::EPSILON);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_insert_until_bucket_is_full() {
        let mut table = BucketTable::new(2, 2, 8);
        assert!(table.insert_fingerprint(7, 1));
        assert!(table.insert_fingerprint(7, 1));
        assert!(!table.insert_fingerprint(9, 1));
        assert!(table.contains_fingerprint(7, 1));
        assert!(!table.contains_fingerprint(7, 0));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_remove_takes_one_duplicate() {
        let mut table = BucketTable::new(1, 4, 8);
        table.insert_fingerprint(5, 0);
        table.insert_fingerprint(5, 0);

        assert!(table.remove_fingerprint(5, 0));
        assert!(table.contains_fingerprint(5, 0));
        assert!(table.remove_fingerprint(5, 0));
        assert!(!table.contains_fingerprint(5, 0));
        assert!(!table.remove_fingerprint(5, 0));
    }

    #[test]
    fn test_rollback_restores_slots() {
        let mut table = BucketTable::new(2, 1, 8);
        table.insert_fingerprint(1, 0);
        table.insert_fingerprint(2, 1);
        let before = table.clone();

        // 3 -> slot (0, 0) evicts 1, 1 -> slot (1, 0) evicts 2, 2 -> slot (0, 0) evicts 3
        let mut path = Vec::new();
        let mut homeless = 3;
        for &slot in &[(0, 0), (1, 0), (0, 0)] {
            homeless = table.swap(slot.0, slot.1, homeless);
            path.push(slot);
        }
        assert_eq!(homeless, 3);

        assert_eq!(table.rollback(&path, homeless), 3);
        assert_eq!(table, before);
    }

    #[test]
    fn test_relocate_occupant() {
        let mut table = BucketTable::new(4, 2, 8);
        table.set(0, 0, 3);
        table.set(0, 1, 5);
        table.set(1, 0, 9);
        table.set(1, 1, 9);

        // bucket 0 pairs with 1, which is full, so 5 moves to bucket 2 instead
        let alternate = |index: usize, fingerprint: u64| {
            if fingerprint == 5 {
                index ^ 2
            } else {
                index ^ 1
            }
        };
        assert_eq!(table.relocate_occupant(0, alternate), Some(1));
        assert_eq!(table.get(0, 1), 0);
        assert!(table.contains_fingerprint(5, 2));
        assert_eq!(table.len(), 4);

        assert_eq!(table.relocate_occupant(1, |index, _| index), None);
    }

    #[test]
    fn test_kick_out_finds_free_slot() {
        let mut table = BucketTable::new(2, 1, 8);
        table.insert_fingerprint(1, 0);
        let mut rng = XorShiftRng::seed_from_u64(0);

        assert!(table.kick_out(&mut rng, 10, 0, 2, |index, _| index ^ 1, false));
        assert_eq!(table.get(0, 0), 2);
        assert_eq!(table.get(1, 0), 1);
    }

    #[test]
    fn test_kick_out_rolls_back_when_exhausted() {
        let mut table = BucketTable::new(2, 1, 8);
        table.insert_fingerprint(1, 0);
        table.insert_fingerprint(2, 1);
        let before = table.clone();
        let mut rng = XorShiftRng::seed_from_u64(0);

        assert!(!table.kick_out(&mut rng, 25, 0, 3, |index, _| index ^ 1, true));
        assert_eq!(table, before);
    }
}
