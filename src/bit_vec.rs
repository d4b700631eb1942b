//! Fixed-length list of bits.

use std::mem;
use std::ops::Index;

/// A fixed-length list of bits implemented using a `Vec<u64>`.
///
/// # Examples
///
/// ```
/// use amq_filters::bit_vec::BitVec;
///
/// let mut bv = BitVec::new(5);
///
/// bv.set(0, true);
/// bv.set(2, true);
/// assert_eq!(
///     bv.iter().collect::<Vec<bool>>(),
///     vec![true, false, true, false, false],
/// );
/// assert_eq!(bv.count_ones(), 2);
///
/// bv.set_all(false);
/// assert_eq!(bv.count_ones(), 0);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct BitVec {
    blocks: Vec<u64>,
    len: usize,
    one_count: usize,
}

const BLOCK_BIT_COUNT: usize = mem::size_of::<u64>() * 8;

impl BitVec {
    fn get_block_count(len: usize) -> usize {
        (len + BLOCK_BIT_COUNT - 1) / BLOCK_BIT_COUNT
    }

    fn clear_extra_bits(&mut self) {
        let extra_bits = self.len % BLOCK_BIT_COUNT;
        if extra_bits > 0 {
            let mask = (1u64 << extra_bits) - 1;
            if let Some(block) = self.blocks.last_mut() {
                *block &= mask;
            }
        }
    }

    /// Constructs a new `BitVec` with a certain number of bits. All bits are initialized to false.
    ///
    /// # Examples
    ///
    /// ```
    /// use amq_filters::bit_vec::BitVec;
    ///
    /// let bv = BitVec::new(5);
    /// assert_eq!(
    ///     bv.iter().collect::<Vec<bool>>(),
    ///     vec![false, false, false, false, false],
    /// );
    /// ```
    pub fn new(len: usize) -> Self {
        BitVec {
            blocks: vec![0; Self::get_block_count(len)],
            len,
            one_count: 0,
        }
    }

    /// Sets the value at index `index` to `bit`.
    ///
    /// # Panics
    ///
    /// Panics if attempt to set an index out-of-bounds.
    pub fn set(&mut self, index: usize, bit: bool) {
        assert!(index < self.len);
        let block_index = index / BLOCK_BIT_COUNT;
        let mask = 1u64 << (index % BLOCK_BIT_COUNT);
        let prev = self.blocks[block_index] & mask != 0;
        if bit && !prev {
            self.one_count += 1;
            self.blocks[block_index] |= mask;
        } else if !bit && prev {
            self.one_count -= 1;
            self.blocks[block_index] &= !mask;
        }
    }

    /// Returns the value at index `index`, or `None` if index is out of bounds.
    ///
    /// # Examples
    ///
    /// ```
    /// use amq_filters::bit_vec::BitVec;
    ///
    /// let mut bv = BitVec::new(5);
    /// bv.set(1, true);
    ///
    /// assert_eq!(bv.get(0), Some(false));
    /// assert_eq!(bv.get(1), Some(true));
    /// assert_eq!(bv.get(5), None);
    /// ```
    pub fn get(&self, index: usize) -> Option<bool> {
        if index >= self.len {
            return None;
        }
        let block = self.blocks[index / BLOCK_BIT_COUNT];
        Some((block >> (index % BLOCK_BIT_COUNT)) & 1 != 0)
    }

    /// Sets all values in the `BitVec` to `bit`.
    pub fn set_all(&mut self, bit: bool) {
        let mask = if bit { !0 } else { 0 };
        self.one_count = if bit { self.len } else { 0 };
        for block in &mut self.blocks {
            *block = mask;
        }
        self.clear_extra_bits();
    }

    /// Returns an iterator over the bits of the `BitVec`.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |index| self[index])
    }

    /// Returns the number of bits in the `BitVec`.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the `BitVec` holds no bits.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of set bits.
    pub fn count_ones(&self) -> usize {
        self.one_count
    }

    /// Returns the number of unset bits.
    pub fn count_zeros(&self) -> usize {
        self.len - self.one_count
    }

    /// Returns the number of bits allocated to back the `BitVec`, a multiple of 64.
    pub fn memory_bits(&self) -> usize {
        self.blocks.len() * BLOCK_BIT_COUNT
    }
}

static TRUE: bool = true;
static FALSE: bool = false;

impl Index<usize> for BitVec {
    type Output = bool;

    fn index(&self, index: usize) -> &bool {
        match self.get(index) {
            Some(true) => &TRUE,
            Some(false) => &FALSE,
            None => panic!("index out of bounds: {} >= {}", index, self.len),
        }
    }
}
