//! # amq-filters
//!
//! `amq-filters` contains approximate membership query (AMQ) filters. An AMQ filter answers
//! "is this key in the set?" with no false negatives and a tunable rate of false positives, using
//! a small fraction of the memory of an exact set.
//!
//! Three filters are provided:
//!
//!  - [`BloomFilter`](bloom/struct.BloomFilter.html): an insert-only bit array probed by `k`
//!    hash functions, sized from a target false positive rate.
//!  - [`CuckooFilter`](cuckoo/struct.CuckooFilter.html): a bucketed table of short fingerprints
//!    with two candidate buckets per key, supporting removal.
//!  - [`VacuumFilter`](vacuum/struct.VacuumFilter.html): a cuckoo filter whose candidate buckets
//!    share a partition of the table, which keeps displacement chains local and lets small
//!    tables use an unrounded length.
//!
//! All three implement [`Filter`](trait.Filter.html), and the two fingerprint filters implement
//! [`RemovableFilter`](trait.RemovableFilter.html). Each filter is sized at construction and
//! never grows. Cuckoo and vacuum insertions report `FilterError::Full` once no slot can be
//! freed; the filter is left unchanged and the caller decides whether to rebuild it larger.
//!
//! Filters are deterministic for a given seed. The library emits `tracing` events for
//! construction parameters and failed insertions but never installs a subscriber.
//!
//! ## Usage
//!
//! ```rust
//! use amq_filters::cuckoo::CuckooFilter;
//! use amq_filters::{Filter, RemovableFilter};
//!
//! let mut filter = CuckooFilter::<u64>::new(1_000, 12).unwrap();
//! for key in 0..1_000u64 {
//!     Filter::insert(&mut filter, &key).unwrap();
//! }
//! assert!((0..1_000u64).all(|key| Filter::contains(&filter, &key)));
//!
//! RemovableFilter::remove(&mut filter, &7u64).unwrap();
//! ```
//!
//! ## References
//!
//!  - [Cuckoo Filter: Practically Better Than Bloom](https://dl.acm.org/citation.cfm?id=2674994)
//!  > Fan, Bin, Dave G. Andersen, Michael Kaminsky, and Michael D. Mitzenmacher. 2014. “Cuckoo Filter: Practically Better Than Bloom.” In *Proceedings of the 10th Acm International on Conference on Emerging Networking Experiments and Technologies*, 75–88. CoNEXT ’14. New York, NY, USA: ACM. doi:[10.1145/2674005.2674994](https://doi.org/10.1145/2674005.2674994).
//!  - [Less hashing, same performance: Building a better Bloom filter](https://dl.acm.org/citation.cfm?id=1400125)
//!  > Kirsch, Adam, and Michael Mitzenmacher. 2008. “Less Hashing, Same Performance: Building a Better Bloom Filter.” *Random Struct. Algorithms* 33 (2). New York, NY, USA: John Wiley & Sons, Inc.: 187–218. doi:[10.1002/rsa.v33:2](https://doi.org/10.1002/rsa.v33:2).
//!  - [Vacuum Filters: More Space-Efficient and Faster Replacement for Bloom and Cuckoo Filters](https://doi.org/10.14778/3372716.3372717)
//!  > Wang, Minmei, Mingxun Zhou, Shouqian Shi, and Chen Qian. 2019. “Vacuum Filters: More Space-Efficient and Faster Replacement for Bloom and Cuckoo Filters.” *Proc. VLDB Endow.* 13 (2): 197–210. doi:[10.14778/3372716.3372717](https://doi.org/10.14778/3372716.3372717).

#![warn(missing_docs)]

pub mod bit_array_vec;
pub mod bit_vec;
pub mod bloom;
mod bucket_table;
pub mod config;
pub mod cuckoo;
mod error;
mod filter;
mod util;
pub mod vacuum;

pub use self::error::{FilterError, Result};
pub use self::filter::{Filter, RemovableFilter};
pub use self::util::{hash, SipHasherBuilder};
