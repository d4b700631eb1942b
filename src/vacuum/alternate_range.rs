/// Number of alternate range classes. A fingerprint's class is `fingerprint % RANGE_CLASS_COUNT`.
pub const RANGE_CLASS_COUNT: usize = 4;

// Candidate ranges must fit their share of items with this much headroom.
const RANGE_LOAD_SLACK: f64 = 0.97;

/// Fewest partitions a partitioned table may have. Selections with fewer partitions fall back to
/// a single partition, since their class ranges are too short to balance load.
pub const MIN_PARTITION_COUNT: usize = 16;

/// Bucket addressing of a `VacuumFilter`.
///
/// Large filters are split into partitions of `partition_len` buckets, where `partition_len` is
/// a power of two. Each fingerprint belongs to one of four range classes, and its alternate
/// bucket is the primary bucket XOR a hash masked to the class's range. Both buckets therefore
/// share a partition, which keeps displacement chains local.
///
/// Small filters, and filters that would split into fewer than [`MIN_PARTITION_COUNT`]
/// partitions, use a single partition spanning the whole table. The table length is then not
/// rounded, and the alternate bucket is a reflection around an offset derived from the
/// fingerprint hash.
///
/// In both modes the alternate function is an involution: the alternate of the alternate bucket
/// is the original bucket.
///
/// # Examples
///
/// ```
/// use amq_filters::vacuum::AlternateRanges;
///
/// let ranges = AlternateRanges::select(300_000, 4, 0.95, 0);
/// assert_eq!(ranges.partition_len(), 4096);
/// assert_eq!(ranges.partition_count(), 20);
/// assert_eq!(ranges.bucket_len(), 20 * 4096);
///
/// let ranges = AlternateRanges::select(100, 4, 0.95, 1 << 18);
/// assert_eq!(ranges.partition_count(), 1);
/// assert_eq!(ranges.bucket_len(), 27);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AlternateRanges {
    bucket_len: usize,
    ranges: Option<[usize; RANGE_CLASS_COUNT]>,
}

fn passes_load_test(
    item_count: usize,
    entries_per_index: usize,
    load_factor: f64,
    ratio: f64,
    range_len: usize,
) -> bool {
    let range_len_f = range_len as f64;
    let chunk_count = (item_count as f64
        / (entries_per_index as f64 * load_factor * range_len_f))
        .ceil();
    let items_per_chunk = ratio * item_count as f64 / chunk_count;
    let deviation = items_per_chunk + 1.5 * (2.0 * items_per_chunk * chunk_count.ln()).sqrt();
    deviation < RANGE_LOAD_SLACK * entries_per_index as f64 * range_len_f
}

fn smallest_passing_range(
    item_count: usize,
    entries_per_index: usize,
    load_factor: f64,
    ratio: f64,
) -> usize {
    let mut range_len = 1;
    while !passes_load_test(item_count, entries_per_index, load_factor, ratio, range_len) {
        range_len <<= 1;
    }
    range_len
}

impl AlternateRanges {
    /// Chooses the table length and alternate ranges for `item_count` items in buckets of
    /// `entries_per_index` slots filled up to `load_factor`. Fewer than `partition_threshold`
    /// items, or fewer than `MIN_PARTITION_COUNT` partitions, yields a single partition.
    pub fn select(
        item_count: usize,
        entries_per_index: usize,
        load_factor: f64,
        partition_threshold: usize,
    ) -> Self {
        let exact_bucket_len =
            (item_count as f64 / (entries_per_index as f64 * load_factor)).ceil() as usize;
        let single = AlternateRanges {
            bucket_len: exact_bucket_len.max(1),
            ranges: None,
        };
        if item_count < partition_threshold {
            return single;
        }

        let mut ranges = [0; RANGE_CLASS_COUNT];
        for (class, range) in ranges.iter_mut().enumerate() {
            let ratio = 1.0 - class as f64 / RANGE_CLASS_COUNT as f64;
            *range = smallest_passing_range(item_count, entries_per_index, load_factor, ratio);
        }
        ranges[RANGE_CLASS_COUNT - 1] *= 2;

        let partition_len = ranges[0];
        for range in ranges.iter_mut() {
            *range = (*range).min(partition_len);
        }

        let partition_count = (item_count as f64
            / (entries_per_index as f64 * load_factor * partition_len as f64))
            .ceil() as usize;
        if partition_count < MIN_PARTITION_COUNT {
            return single;
        }

        AlternateRanges {
            bucket_len: partition_count * partition_len,
            ranges: Some(ranges),
        }
    }

    /// Returns the number of buckets in the table.
    pub fn bucket_len(&self) -> usize {
        self.bucket_len
    }

    /// Returns the number of buckets in each partition.
    pub fn partition_len(&self) -> usize {
        match self.ranges {
            Some(ranges) => ranges[0],
            None => self.bucket_len,
        }
    }

    /// Returns the number of partitions.
    pub fn partition_count(&self) -> usize {
        self.bucket_len / self.partition_len()
    }

    /// Returns the alternate range of each fingerprint class, or `None` for a single partition.
    pub fn ranges(&self) -> Option<[usize; RANGE_CLASS_COUNT]> {
        self.ranges
    }

    /// Returns the alternate bucket of `index` for `fingerprint`, given `hash`, the hash of the
    /// fingerprint.
    pub(crate) fn alternate(&self, index: usize, fingerprint: u64, hash: u64) -> usize {
        match self.ranges {
            Some(ranges) => {
                let range = ranges[(fingerprint % RANGE_CLASS_COUNT as u64) as usize];
                index ^ (hash as usize & (range - 1))
            }
            None => {
                let bucket_len = self.bucket_len;
                let offset = (hash % bucket_len as u64) as usize;
                let reflected = (index + bucket_len - offset) % bucket_len;
                (bucket_len - 1 - reflected + offset) % bucket_len
            }
        }
    }
}
