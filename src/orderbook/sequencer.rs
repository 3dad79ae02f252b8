//! Process-wide order sequencing.

use std::sync::atomic::{AtomicU64, Ordering};

/// Issues strictly increasing, globally unique order ids.
///
/// The issued value is also the arrival rank of an order: among resting
/// orders at the same price, the lower sequence number is ahead in the queue.
#[derive(Debug, Default)]
pub struct Sequencer {
    counter: AtomicU64,
}

impl Sequencer {
    /// Creates a sequencer whose first issued value is 1
    pub const fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }

    /// Creates a sequencer whose first issued value is `first`
    pub const fn starting_at(first: u64) -> Self {
        Self {
            counter: AtomicU64::new(first.saturating_sub(1)),
        }
    }

    /// Returns a value strictly greater than every value returned before.
    pub fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// The most recently issued value, 0 if nothing was issued yet
    pub fn last_issued(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}
