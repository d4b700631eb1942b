//! Fixed-length list of small bit arrays.

use std::mem;

/// A fixed-length list of `bit_count`-bit values packed into a `Vec<u64>`.
///
/// Values may straddle two blocks. A value of zero is counted as unoccupied, which lets the
/// bucketed filters use it as their empty-slot sentinel.
///
/// # Examples
///
/// ```
/// use amq_filters::bit_array_vec::BitArrayVec;
///
/// let mut bav = BitArrayVec::new(12, 4);
///
/// bav.set(0, 0xABC);
/// bav.set(3, 1);
///
/// assert_eq!(bav.get(0), 0xABC);
/// assert_eq!(bav.get(1), 0);
/// assert_eq!(bav.occupied_len(), 2);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct BitArrayVec {
    blocks: Vec<u64>,
    bit_count: usize,
    occupied_len: usize,
    len: usize,
}

const BLOCK_BIT_COUNT: usize = mem::size_of::<u64>() * 8;

impl BitArrayVec {
    fn get_block_count(bit_count: usize, len: usize) -> usize {
        (bit_count * len + BLOCK_BIT_COUNT - 1) / BLOCK_BIT_COUNT
    }

    #[inline]
    fn mask(&self) -> u64 {
        if self.bit_count == BLOCK_BIT_COUNT {
            !0
        } else {
            (1u64 << self.bit_count) - 1
        }
    }

    /// Constructs a new `BitArrayVec` holding `len` values of `bit_count` bits each. All values
    /// are initialized to zero.
    ///
    /// # Panics
    ///
    /// Panics if `bit_count` is 0 or greater than 64.
    pub fn new(bit_count: usize, len: usize) -> Self {
        assert!(bit_count > 0 && bit_count <= BLOCK_BIT_COUNT);
        BitArrayVec {
            blocks: vec![0; Self::get_block_count(bit_count, len)],
            bit_count,
            occupied_len: 0,
            len,
        }
    }

    /// Sets the value at index `index` to `value`. Bits of `value` above `bit_count` are
    /// discarded.
    ///
    /// # Panics
    ///
    /// Panics if attempt to set an index out-of-bounds.
    pub fn set(&mut self, index: usize, value: u64) {
        assert!(index < self.len);
        let mask = self.mask();
        let value = value & mask;
        let prev_is_zero = self.get(index) == 0;

        let bits_offset = index * self.bit_count;
        let block_index = bits_offset / BLOCK_BIT_COUNT;
        let shift = bits_offset % BLOCK_BIT_COUNT;

        self.blocks[block_index] &= !(mask << shift);
        self.blocks[block_index] |= value << shift;

        if shift + self.bit_count > BLOCK_BIT_COUNT {
            let high_bits = shift + self.bit_count - BLOCK_BIT_COUNT;
            let high_mask = (1u64 << high_bits) - 1;
            self.blocks[block_index + 1] &= !high_mask;
            self.blocks[block_index + 1] |= value >> (BLOCK_BIT_COUNT - shift);
        }

        let curr_is_zero = value == 0;
        if prev_is_zero != curr_is_zero {
            if curr_is_zero {
                self.occupied_len -= 1;
            } else {
                self.occupied_len += 1;
            }
        }
    }

    /// Returns the value at index `index`.
    ///
    /// # Panics
    ///
    /// Panics if attempt to get an index out-of-bounds.
    pub fn get(&self, index: usize) -> u64 {
        assert!(index < self.len);
        let bits_offset = index * self.bit_count;
        let block_index = bits_offset / BLOCK_BIT_COUNT;
        let shift = bits_offset % BLOCK_BIT_COUNT;

        let mut value = self.blocks[block_index] >> shift;
        if shift + self.bit_count > BLOCK_BIT_COUNT {
            value |= self.blocks[block_index + 1] << (BLOCK_BIT_COUNT - shift);
        }
        value & self.mask()
    }

    /// Sets every value to zero.
    pub fn clear(&mut self) {
        self.occupied_len = 0;
        for block in &mut self.blocks {
            *block = 0;
        }
    }

    /// Returns the number of values in the `BitArrayVec`.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the `BitArrayVec` holds no values.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of non-zero values in the `BitArrayVec`.
    pub fn occupied_len(&self) -> usize {
        self.occupied_len
    }

    /// Returns the number of bits in each value.
    pub fn bit_count(&self) -> usize {
        self.bit_count
    }

    /// Returns the number of bits allocated to back the `BitArrayVec`.
    pub fn memory_bits(&self) -> usize {
        self.blocks.len() * BLOCK_BIT_COUNT
    }
}

#[cfg(test)]
mod tests {
    use super::BitArrayVec;
    use proptest::prelude::*;

    #[test]
    fn test_new() {
        let bav = BitArrayVec::new(12, 16);
        assert_eq!(bav.len(), 16);
        assert!(!bav.is_empty());
        assert_eq!(bav.bit_count(), 12);
        assert_eq!(bav.occupied_len(), 0);
        assert_eq!(bav.memory_bits(), 192);
        assert!((0..16).all(|index| bav.get(index) == 0));
    }

    #[test]
    fn test_set_straddling_blocks() {
        let mut bav = BitArrayVec::new(12, 16);
        // index 5 occupies bits 60..72
        bav.set(5, 0xFFF);
        bav.set(4, 0x123);
        bav.set(6, 0x456);

        assert_eq!(bav.get(4), 0x123);
        assert_eq!(bav.get(5), 0xFFF);
        assert_eq!(bav.get(6), 0x456);

        bav.set(5, 0x801);
        assert_eq!(bav.get(4), 0x123);
        assert_eq!(bav.get(5), 0x801);
        assert_eq!(bav.get(6), 0x456);
    }

    #[test]
    fn test_occupied_len() {
        let mut bav = BitArrayVec::new(8, 4);
        bav.set(0, 1);
        bav.set(0, 2);
        bav.set(1, 3);
        assert_eq!(bav.occupied_len(), 2);

        bav.set(0, 0);
        assert_eq!(bav.occupied_len(), 1);

        bav.clear();
        assert_eq!(bav.occupied_len(), 0);
        assert_eq!(bav.get(1), 0);
    }

    #[test]
    fn test_full_width_values() {
        let mut bav = BitArrayVec::new(64, 3);
        bav.set(1, !0);
        assert_eq!(bav.get(0), 0);
        assert_eq!(bav.get(1), !0);
        assert_eq!(bav.get(2), 0);
    }

    proptest! {
        #[test]
        fn set_only_touches_its_own_slot(
            bit_count in 1usize..=64,
            values in proptest::collection::vec(any::<u64>(), 1..40),
        ) {
            let mut bav = BitArrayVec::new(bit_count, values.len());
            let mask = if bit_count == 64 { !0 } else { (1u64 << bit_count) - 1 };
            for (index, value) in values.iter().enumerate() {
                bav.set(index, *value);
            }
            for (index, value) in values.iter().enumerate() {
                prop_assert_eq!(bav.get(index), value & mask);
            }
            let occupied = values.iter().filter(|value| *value & mask != 0).count();
            prop_assert_eq!(bav.occupied_len(), occupied);
        }
    }
}
