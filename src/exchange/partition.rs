//! Instrument to book mapping.

use rustc_hash::FxHasher;
use std::hash::Hasher;

/// Map an instrument identifier to one of `partitions` books.
///
/// The mapping is pure: FxHash has no per-process seed, so a given
/// identifier lands on the same book for the lifetime of the process (and
/// across processes). Distinct instruments may collide; they then share one
/// book and trade against each other.
pub fn partition_of(instrument: &str, partitions: usize) -> usize {
    debug_assert!(partitions > 0);
    let mut hasher = FxHasher::default();
    hasher.write(instrument.as_bytes());
    (hasher.finish() % partitions as u64) as usize
}
